//! Load observation and panel tables from CSV

use std::io::Read;
use std::path::Path;

use csv::Reader;
use log::debug;

use super::{ObservationRecord, ObservationTable, PanelRecord, PanelTable};
use crate::error::Result;

/// Load the observation table from a CSV file
pub fn load_observations<P: AsRef<Path>>(path: P) -> Result<ObservationTable> {
    let reader = Reader::from_path(path.as_ref())?;
    let table = read_observations(reader)?;
    debug!(
        "loaded {} observation rows from {}",
        table.len(),
        path.as_ref().display()
    );
    Ok(table)
}

/// Load the observation table from any reader (e.g., string buffer)
pub fn load_observations_from_reader<R: Read>(reader: R) -> Result<ObservationTable> {
    read_observations(Reader::from_reader(reader))
}

/// Load the panel table from a CSV file
pub fn load_panel<P: AsRef<Path>>(path: P) -> Result<PanelTable> {
    let reader = Reader::from_path(path.as_ref())?;
    let table = read_panel(reader)?;
    debug!(
        "loaded {} panel rows from {}",
        table.len(),
        path.as_ref().display()
    );
    Ok(table)
}

/// Load the panel table from any reader
pub fn load_panel_from_reader<R: Read>(reader: R) -> Result<PanelTable> {
    read_panel(Reader::from_reader(reader))
}

fn read_observations<R: Read>(mut reader: Reader<R>) -> Result<ObservationTable> {
    let mut records = Vec::new();
    for result in reader.deserialize() {
        let row: ObservationRecord = result?;
        records.push(row);
    }
    ObservationTable::new(records)
}

fn read_panel<R: Read>(mut reader: Reader<R>) -> Result<PanelTable> {
    let mut records = Vec::new();
    for result in reader.deserialize() {
        let row: PanelRecord = result?;
        records.push(row);
    }
    PanelTable::new(records)
}
