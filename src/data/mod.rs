//! Typed input tables and their CSV loaders

mod records;
pub mod loader;

pub use records::{AgeRange, Gender, ObservationRecord, ObservationTable, PanelRecord, PanelTable};
pub use loader::{load_observations, load_observations_from_reader, load_panel, load_panel_from_reader};
