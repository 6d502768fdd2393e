//! Disability prevalence by age at event and income decile

use std::collections::BTreeMap;

use log::debug;

use super::smoothing::PrevalenceCurve;
use crate::data::{AgeRange, ObservationTable};

/// Disabled / non-disabled counts for one (age, decile) cell
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellCounts {
    pub disabled: usize,
    pub non_disabled: usize,
}

/// Prevalence of one cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrevalenceCell {
    /// disabled-count / non-disabled-count
    Ratio(f64),
    /// No non-disabled respondents in the cell
    Undefined,
}

impl From<CellCounts> for PrevalenceCell {
    fn from(counts: CellCounts) -> Self {
        if counts.non_disabled == 0 {
            PrevalenceCell::Undefined
        } else {
            PrevalenceCell::Ratio(counts.disabled as f64 / counts.non_disabled as f64)
        }
    }
}

/// (age, income decile) -> prevalence ratio
#[derive(Debug, Clone, Default)]
pub struct PrevalenceTable {
    cells: BTreeMap<(u32, u32), PrevalenceCell>,
}

impl PrevalenceTable {
    /// Count disabled and non-disabled rows per cell, excluding ages at or
    /// above `plus_age_cutoff`
    pub fn from_observations(observations: &ObservationTable, plus_age_cutoff: u32) -> Self {
        let mut counts: BTreeMap<(u32, u32), CellCounts> = BTreeMap::new();

        for record in observations.records() {
            if record.age_at_event >= plus_age_cutoff {
                continue;
            }
            let cell = counts
                .entry((record.age_at_event, record.income_decile))
                .or_default();
            if record.is_disabled() {
                cell.disabled += 1;
            } else {
                cell.non_disabled += 1;
            }
        }

        let table = Self::from_counts(counts);
        debug!(
            "prevalence table: {} cells, {} undefined",
            table.len(),
            table.undefined_cells()
        );
        table
    }

    pub fn from_counts(counts: BTreeMap<(u32, u32), CellCounts>) -> Self {
        let cells = counts
            .into_iter()
            .map(|(key, c)| (key, PrevalenceCell::from(c)))
            .collect();
        Self { cells }
    }

    pub fn cell(&self, age: u32, income_decile: u32) -> Option<PrevalenceCell> {
        self.cells.get(&(age, income_decile)).copied()
    }

    /// Ratio for the cell; missing and undefined cells resolve to 0
    pub fn ratio(&self, age: u32, income_decile: u32) -> f64 {
        match self.cell(age, income_decile) {
            Some(PrevalenceCell::Ratio(r)) => r,
            Some(PrevalenceCell::Undefined) | None => 0.0,
        }
    }

    /// Raw prevalence for every modeled age of one decile
    pub fn curve(&self, range: AgeRange, income_decile: u32) -> PrevalenceCurve {
        let values = range.ages().map(|age| self.ratio(age, income_decile)).collect();
        PrevalenceCurve::new(range.start_age, values)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(u32, u32), &PrevalenceCell)> {
        self.cells.iter()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn undefined_cells(&self) -> usize {
        self.cells
            .values()
            .filter(|c| matches!(c, PrevalenceCell::Undefined))
            .count()
    }
}
