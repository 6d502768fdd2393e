//! Observation and panel tables produced by the survey preparation step

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{LongevityError, Result};

/// Gender of the respondent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    /// Numeric flag used as a model feature (1 = female)
    pub fn flag(&self) -> u8 {
        match self {
            Gender::Male => 0,
            Gender::Female => 1,
        }
    }

    pub fn from_flag(flag: u8) -> Result<Self> {
        match flag {
            0 => Ok(Gender::Male),
            1 => Ok(Gender::Female),
            other => Err(LongevityError::InvalidInput(format!(
                "gender flag must be 0 or 1, found {}",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

/// One person-wave row of the cleaned survey
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    #[serde(alias = "mergeid")]
    pub id: String,
    pub age: u32,
    #[serde(alias = "income_dcl")]
    pub income_decile: u32,
    #[serde(alias = "gender_num")]
    pub gender_flag: u8,
    pub disabled: u8,
    /// Age at death for the deceased, age at interview otherwise
    #[serde(alias = "is_aged")]
    pub age_at_event: u32,
    pub is_dead: u8,
}

impl ObservationRecord {
    pub fn is_disabled(&self) -> bool {
        self.disabled == 1
    }
}

/// One person-year row with a "died in the following year" label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelRecord {
    pub age: u32,
    #[serde(alias = "income_dcl")]
    pub income_decile: u32,
    #[serde(alias = "gender_num")]
    pub gender_flag: u8,
    pub y: u8,
}

/// Modeled age span
///
/// `end_age` is exclusive: transient ages are `start_age..end_age` and the
/// open-ended top age group is `end_age - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    pub start_age: u32,
    pub end_age: u32,
}

impl AgeRange {
    pub fn new(start_age: u32, end_age: u32) -> Result<Self> {
        if end_age <= start_age {
            return Err(LongevityError::InvalidInput(format!(
                "age range must be non-empty, got start {} end {}",
                start_age, end_age
            )));
        }
        Ok(Self { start_age, end_age })
    }

    /// Range covering the observed minimum and maximum ages inclusively
    pub fn from_observed(min_age: u32, max_age: u32) -> Result<Self> {
        Self::new(min_age, max_age + 1)
    }

    /// Number of transient age states
    pub fn diff(&self) -> usize {
        (self.end_age - self.start_age) as usize
    }

    pub fn ages(&self) -> impl Iterator<Item = u32> {
        self.start_age..self.end_age
    }

    /// Oldest modeled age, treated as an open-ended "plus" group
    pub fn final_age(&self) -> u32 {
        self.end_age - 1
    }

    pub fn index_of(&self, age: u32) -> Option<usize> {
        if age >= self.start_age && age < self.end_age {
            Some((age - self.start_age) as usize)
        } else {
            None
        }
    }
}

fn check_flag(name: &str, value: u8) -> Result<()> {
    if value > 1 {
        return Err(LongevityError::InvalidInput(format!(
            "{} must be 0 or 1, found {}",
            name, value
        )));
    }
    Ok(())
}

/// Validated observation table
#[derive(Debug, Clone)]
pub struct ObservationTable {
    records: Vec<ObservationRecord>,
}

impl ObservationTable {
    pub fn new(records: Vec<ObservationRecord>) -> Result<Self> {
        if records.is_empty() {
            return Err(LongevityError::InvalidInput(
                "observation table is empty".to_string(),
            ));
        }
        for record in &records {
            check_flag("gender_flag", record.gender_flag)?;
            check_flag("disabled", record.disabled)?;
            check_flag("is_dead", record.is_dead)?;
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[ObservationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Age range spanned by the observed `age` column
    pub fn age_range(&self) -> Result<AgeRange> {
        let min_age = self.records.iter().map(|r| r.age).min().unwrap_or(0);
        let max_age = self.records.iter().map(|r| r.age).max().unwrap_or(0);
        AgeRange::from_observed(min_age, max_age)
    }

    /// Distinct income deciles present, ascending
    pub fn income_deciles(&self) -> Vec<u32> {
        self.records
            .iter()
            .map(|r| r.income_decile)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn income_buckets(&self) -> usize {
        self.income_deciles().len()
    }
}

/// Validated person-year panel table
#[derive(Debug, Clone)]
pub struct PanelTable {
    records: Vec<PanelRecord>,
}

impl PanelTable {
    pub fn new(records: Vec<PanelRecord>) -> Result<Self> {
        for record in &records {
            check_flag("gender_flag", record.gender_flag)?;
            check_flag("y", record.y)?;
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[PanelRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of distinct values in the label column
    pub fn distinct_labels(&self) -> usize {
        self.records.iter().map(|r| r.y).collect::<BTreeSet<_>>().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(age: u32, decile: u32) -> ObservationRecord {
        ObservationRecord {
            id: format!("id-{}-{}", age, decile),
            age,
            income_decile: decile,
            gender_flag: 0,
            disabled: 0,
            age_at_event: age,
            is_dead: 0,
        }
    }

    #[test]
    fn test_age_range_is_exclusive_of_end() {
        let range = AgeRange::from_observed(65, 90).unwrap();
        assert_eq!(range.diff(), 26);
        assert_eq!(range.final_age(), 90);
        assert_eq!(range.index_of(65), Some(0));
        assert_eq!(range.index_of(90), Some(25));
        assert_eq!(range.index_of(91), None);
        assert_eq!(range.ages().count(), 26);
    }

    #[test]
    fn test_empty_age_range_rejected() {
        assert!(AgeRange::new(70, 70).is_err());
    }

    #[test]
    fn test_observation_table_summaries() {
        let table = ObservationTable::new(vec![
            observation(66, 3),
            observation(80, 1),
            observation(72, 3),
        ])
        .unwrap();

        let range = table.age_range().unwrap();
        assert_eq!(range.start_age, 66);
        assert_eq!(range.end_age, 81);
        assert_eq!(table.income_deciles(), vec![1, 3]);
        assert_eq!(table.income_buckets(), 2);
    }

    #[test]
    fn test_invalid_flags_rejected() {
        let mut bad = observation(70, 0);
        bad.disabled = 2;
        assert!(ObservationTable::new(vec![bad]).is_err());

        let panel = PanelTable::new(vec![PanelRecord {
            age: 70,
            income_decile: 0,
            gender_flag: 0,
            y: 3,
        }]);
        assert!(panel.is_err());
    }

    #[test]
    fn test_gender_flag_roundtrip() {
        for gender in Gender::ALL {
            assert_eq!(Gender::from_flag(gender.flag()).unwrap(), gender);
        }
        assert!(Gender::from_flag(4).is_err());
    }
}
