//! One-year mortality model by age, gender and income decile
//!
//! The model is either fitted from the person-year panel or evaluated from a
//! supplied set of linear coefficients through a logistic link. The variant
//! is chosen once at construction.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use log::info;
use serde::{Deserialize, Serialize};

use super::logistic::LogisticClassifier;
use crate::config::FitOptions;
use crate::data::{Gender, PanelTable};
use crate::error::{LongevityError, Result};

/// Numerically stable logistic function
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Survival and death probabilities over one year; they sum to one
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeathProbability {
    pub p_alive: f64,
    pub p_dead: f64,
}

impl DeathProbability {
    pub fn from_p_dead(p_dead: f64) -> Self {
        Self {
            p_alive: 1.0 - p_dead,
            p_dead,
        }
    }
}

/// Linear coefficients of a pre-fit sigmoid mortality model (no intercept)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoefficientSet {
    pub age: f64,
    #[serde(alias = "income_dcl")]
    pub income_decile: f64,
    #[serde(alias = "gender_num")]
    pub gender_flag: f64,
}

impl CoefficientSet {
    pub fn new(age: f64, income_decile: f64, gender_flag: f64) -> Self {
        Self {
            age,
            income_decile,
            gender_flag,
        }
    }

    pub fn zeros() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Build from `[age, income_decile, gender_flag]`
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        match values {
            [age, income, gender] => Ok(Self::new(*age, *income, *gender)),
            _ => Err(LongevityError::dimension(
                "coefficient vector",
                (3, 1),
                (values.len(), 1),
            )),
        }
    }

    pub fn from_json_path(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    pub fn linear_predictor(&self, age: u32, income_decile: u32, gender: Gender) -> f64 {
        self.age * age as f64
            + self.income_decile * income_decile as f64
            + self.gender_flag * gender.flag() as f64
    }
}

/// Panel-backed model whose classifier is trained on first use
///
/// Clones share one classifier cache, so the fit runs at most once however
/// many subgroup estimators hold the model.
#[derive(Debug, Clone)]
pub struct FittedMortality {
    panel: Arc<PanelTable>,
    options: FitOptions,
    classifier: Arc<OnceLock<LogisticClassifier>>,
}

impl FittedMortality {
    /// Train the classifier if it has not been trained yet
    pub fn classifier(&self) -> Result<&LogisticClassifier> {
        if let Some(clf) = self.classifier.get() {
            return Ok(clf);
        }
        info!("fitting mortality classifier on {} panel rows", self.panel.len());
        let clf = LogisticClassifier::fit(&self.panel, &self.options)?;
        Ok(self.classifier.get_or_init(|| clf))
    }

    pub fn is_trained(&self) -> bool {
        self.classifier.get().is_some()
    }
}

/// Source of one-year death probabilities
#[derive(Debug, Clone)]
pub enum MortalityModel {
    /// Logistic classifier trained lazily on the full panel table
    Fitted(FittedMortality),
    /// Sigmoid of a supplied linear coefficient set
    Provided(CoefficientSet),
}

impl MortalityModel {
    pub fn fitted(panel: Arc<PanelTable>, options: FitOptions) -> Self {
        MortalityModel::Fitted(FittedMortality {
            panel,
            options,
            classifier: Arc::new(OnceLock::new()),
        })
    }

    pub fn provided(coefficients: CoefficientSet) -> Self {
        MortalityModel::Provided(coefficients)
    }

    /// Force training of a fitted model so clones share the result
    pub fn ensure_fitted(&self) -> Result<()> {
        if let MortalityModel::Fitted(fitted) = self {
            fitted.classifier()?;
        }
        Ok(())
    }

    /// One-year survival and death probabilities
    pub fn probability_of_death(
        &self,
        age: u32,
        gender: Gender,
        income_decile: u32,
    ) -> Result<DeathProbability> {
        match self {
            MortalityModel::Fitted(fitted) => {
                let clf = fitted.classifier()?;
                Ok(clf.predict_proba(age, income_decile, gender.flag()))
            }
            MortalityModel::Provided(coefficients) => {
                let z = coefficients.linear_predictor(age, income_decile, gender);
                Ok(DeathProbability::from_p_dead(sigmoid(z)))
            }
        }
    }
}
