//! Subgroup runner for batch estimation
//!
//! Holds the observation table and mortality model once, then estimates
//! every gender and income decile in parallel.

use log::info;
use ndarray::Array1;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::EstimatorConfig;
use crate::data::{Gender, ObservationTable};
use crate::error::Result;
use crate::inequality::{gini, theil};
use crate::markov::{LifetimeEstimates, LongevityEstimator};
use crate::assumptions::MortalityModel;

/// Estimates for one gender and income decile
#[derive(Debug, Clone)]
pub struct SubgroupEstimate {
    pub gender: Gender,
    pub income_decile: u32,
    pub estimates: LifetimeEstimates,
}

/// Flat output row, one per subgroup and starting age
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubgroupRow {
    pub gender: Gender,
    pub income_decile: u32,
    pub age: u32,
    pub mean: f64,
    pub std: f64,
}

impl SubgroupEstimate {
    pub fn rows(&self) -> Vec<SubgroupRow> {
        self.estimates
            .rows()
            .into_iter()
            .map(|r| SubgroupRow {
                gender: self.gender,
                income_decile: self.income_decile,
                age: r.age,
                mean: r.mean,
                std: r.std,
            })
            .collect()
    }

    /// Mean at the first modeled age
    pub fn mean_at_start(&self) -> f64 {
        self.estimates.mean.get(0).copied().unwrap_or(0.0)
    }
}

/// Inequality across income deciles of one gender
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InequalitySummary {
    pub gender: Gender,
    pub start_age: u32,
    /// Mean at `start_age` for each decile, ascending by decile
    pub deciles: Vec<u32>,
    pub means: Vec<f64>,
    pub gini: f64,
    pub theil: f64,
}

/// Pre-loaded runner over every subgroup of an observation table
///
/// # Example
/// ```ignore
/// let runner = SubgroupRunner::new(observations, model, EstimatorConfig::default());
/// let estimates = runner.run_all(true)?;
/// let summary = SubgroupRunner::summarize(&estimates)?;
/// ```
#[derive(Debug, Clone)]
pub struct SubgroupRunner {
    observations: ObservationTable,
    mortality: MortalityModel,
    config: EstimatorConfig,
}

impl SubgroupRunner {
    pub fn new(observations: ObservationTable, mortality: MortalityModel, config: EstimatorConfig) -> Self {
        Self {
            observations,
            mortality,
            config,
        }
    }

    pub fn observations(&self) -> &ObservationTable {
        &self.observations
    }

    pub fn mortality(&self) -> &MortalityModel {
        &self.mortality
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Every (gender, decile) pair, deciles taken from the observations
    pub fn subgroups(&self) -> Vec<(Gender, u32)> {
        let deciles = self.observations.income_deciles();
        Gender::ALL
            .iter()
            .flat_map(|&g| deciles.iter().map(move |&d| (g, d)))
            .collect()
    }

    /// Estimate a single subgroup
    pub fn run(&self, gender: Gender, income_decile: u32, healthy_life_only: bool) -> Result<SubgroupEstimate> {
        let estimator = LongevityEstimator::new(
            &self.observations,
            self.mortality.clone(),
            gender,
            income_decile,
            self.config.clone(),
        )?;
        Ok(SubgroupEstimate {
            gender,
            income_decile,
            estimates: estimator.compute_lifetime_estimates(healthy_life_only)?,
        })
    }

    /// Estimate every subgroup in parallel
    ///
    /// A fitted mortality model is trained once up front so that the
    /// per-subgroup clones reuse the same coefficients.
    pub fn run_all(&self, healthy_life_only: bool) -> Result<Vec<SubgroupEstimate>> {
        self.mortality.ensure_fitted()?;

        let subgroups = self.subgroups();
        info!(
            "estimating {} subgroups ({} income buckets)",
            subgroups.len(),
            self.observations.income_buckets()
        );

        subgroups
            .par_iter()
            .map(|&(gender, decile)| self.run(gender, decile, healthy_life_only))
            .collect()
    }

    /// Gini and Theil of the start-age mean across deciles, per gender
    pub fn summarize(estimates: &[SubgroupEstimate]) -> Result<Vec<InequalitySummary>> {
        let mut summaries = Vec::new();
        for gender in Gender::ALL {
            let mut group: Vec<&SubgroupEstimate> =
                estimates.iter().filter(|e| e.gender == gender).collect();
            if group.is_empty() {
                continue;
            }
            group.sort_by_key(|e| e.income_decile);

            let means: Vec<f64> = group.iter().map(|e| e.mean_at_start()).collect();
            let values = Array1::from(means.clone());
            summaries.push(InequalitySummary {
                gender,
                start_age: group[0].estimates.range.start_age,
                deciles: group.iter().map(|e| e.income_decile).collect(),
                gini: gini(&values)?,
                theil: theil(&values)?,
                means,
            });
        }
        Ok(summaries)
    }
}
