//! Estimator configuration

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Ages at or above this cutoff are excluded from prevalence counts
pub const DEFAULT_PLUS_AGE_CUTOFF: u32 = 88;

/// Smoothing applied to the per-decile disability prevalence curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrevalenceSmoothing {
    /// Use raw prevalence ratios
    #[default]
    None,
    /// Fill zero gaps, then fit `a * exp(b * age)` through the curve
    Exponential,
}

/// Options for the regularized logistic mortality fit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FitOptions {
    /// Inverse L2 regularization strength (intercept is not penalized)
    pub penalty_c: f64,
    pub max_iterations: usize,
    /// Convergence threshold on the largest Newton step component
    pub tolerance: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            penalty_c: 1.0,
            max_iterations: 100,
            tolerance: 1e-8,
        }
    }
}

/// Configuration shared by every subgroup estimator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    pub plus_age_cutoff: u32,
    pub smoothing: PrevalenceSmoothing,
    pub fit: FitOptions,
    /// |det(I - U)| below this is treated as singular
    pub singularity_tolerance: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            plus_age_cutoff: DEFAULT_PLUS_AGE_CUTOFF,
            smoothing: PrevalenceSmoothing::None,
            fit: FitOptions::default(),
            singularity_tolerance: 1e-12,
        }
    }
}

impl EstimatorConfig {
    /// Load a configuration from a JSON file; missing fields take defaults
    pub fn from_json_path(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}
