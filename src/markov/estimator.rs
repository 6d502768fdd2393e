//! Per-subgroup longevity estimator
//!
//! Wires the prevalence table, the mortality model, the transition matrices
//! and the moment engine together for one gender and income decile.

use log::{debug, warn};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::moments::{MomentEngine, RewardMoments};
use super::reward::{healthy_life_reward, total_life_reward, RewardKind};
use super::transition::{TransitionMatrices, TransitionMatrixBuilder};
use crate::assumptions::{MortalityModel, PrevalenceCurve, PrevalenceTable};
use crate::config::{EstimatorConfig, PrevalenceSmoothing};
use crate::data::{AgeRange, Gender, ObservationTable};
use crate::error::{LongevityError, Result};

/// Mean and standard deviation of remaining (healthy) years by starting age
#[derive(Debug, Clone, PartialEq)]
pub struct LifetimeEstimates {
    pub range: AgeRange,
    pub reward: RewardKind,
    pub mean: Array1<f64>,
    pub std: Array1<f64>,
}

/// One starting age of a [`LifetimeEstimates`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LifetimeRow {
    pub age: u32,
    pub mean: f64,
    pub std: f64,
}

impl LifetimeEstimates {
    pub fn rows(&self) -> Vec<LifetimeRow> {
        self.range
            .ages()
            .zip(self.mean.iter().zip(self.std.iter()))
            .map(|(age, (&mean, &std))| LifetimeRow { age, mean, std })
            .collect()
    }

    pub fn at_age(&self, age: u32) -> Option<LifetimeRow> {
        let idx = self.range.index_of(age)?;
        Some(LifetimeRow {
            age,
            mean: self.mean[idx],
            std: self.std[idx],
        })
    }
}

/// Estimator for one gender and income decile
#[derive(Debug, Clone)]
pub struct LongevityEstimator {
    range: AgeRange,
    prevalence: PrevalenceTable,
    curve: PrevalenceCurve,
    mortality: MortalityModel,
    gender: Gender,
    income_decile: u32,
    income_buckets: usize,
    config: EstimatorConfig,
}

impl LongevityEstimator {
    pub fn new(
        observations: &ObservationTable,
        mortality: MortalityModel,
        gender: Gender,
        income_decile: u32,
        config: EstimatorConfig,
    ) -> Result<Self> {
        let range = observations.age_range()?;
        let income_buckets = observations.income_buckets();
        if !observations.income_deciles().contains(&income_decile) {
            warn!(
                "income decile {} not present in observations ({} buckets)",
                income_decile, income_buckets
            );
        }
        let prevalence = PrevalenceTable::from_observations(observations, config.plus_age_cutoff);
        let raw = prevalence.curve(range, income_decile);
        let curve = match config.smoothing {
            PrevalenceSmoothing::None => raw,
            PrevalenceSmoothing::Exponential => raw.smooth_exponential()?,
        };

        Ok(Self {
            range,
            prevalence,
            curve,
            mortality,
            gender,
            income_decile,
            income_buckets,
            config,
        })
    }

    pub fn age_range(&self) -> AgeRange {
        self.range
    }

    pub fn gender(&self) -> Gender {
        self.gender
    }

    pub fn income_decile(&self) -> u32 {
        self.income_decile
    }

    pub fn income_buckets(&self) -> usize {
        self.income_buckets
    }

    pub fn prevalence_table(&self) -> &PrevalenceTable {
        &self.prevalence
    }

    pub fn mortality(&self) -> &MortalityModel {
        &self.mortality
    }

    /// Prevalence curve of this decile over the modeled ages, smoothed if configured
    pub fn prevalence_curve(&self) -> &PrevalenceCurve {
        &self.curve
    }

    /// Disability prevalence for one modeled age
    pub fn prevalence(&self, age: u32) -> Result<f64> {
        self.curve.get(age).ok_or_else(|| {
            LongevityError::InvalidInput(format!(
                "age {} outside modeled range {}..{}",
                age, self.range.start_age, self.range.end_age
            ))
        })
    }

    /// Healthy-year reward matrix, `(diff + 1) x (diff + 1)`
    pub fn prevalence_matrix(&self) -> Array2<f64> {
        healthy_life_reward(self.curve.values())
    }

    /// `U` and `P` for this subgroup
    pub fn compute_up(&self) -> Result<TransitionMatrices> {
        TransitionMatrixBuilder::new(&self.mortality, self.range).build(self.gender, self.income_decile)
    }

    /// First three moments of healthy or total years until death
    pub fn compute_moments(
        &self,
        matrices: &TransitionMatrices,
        prevalence_matrix: &Array2<f64>,
        healthy_life_only: bool,
    ) -> Result<RewardMoments> {
        let engine = MomentEngine::new(matrices, self.config.singularity_tolerance)?;
        match RewardKind::from_healthy_flag(healthy_life_only) {
            RewardKind::HealthyLife => engine.compute_moments(prevalence_matrix),
            RewardKind::TotalLife => engine.compute_moments(&total_life_reward(matrices.diff())),
        }
    }

    pub fn compute_lifetime_estimates(&self, healthy_life_only: bool) -> Result<LifetimeEstimates> {
        let prevalence_matrix = self.prevalence_matrix();
        let matrices = self.compute_up()?;
        let moments = self.compute_moments(&matrices, &prevalence_matrix, healthy_life_only)?;

        debug!(
            "{} decile {}: life expectancy at {} = {:.3} ({})",
            self.gender.as_str(),
            self.income_decile,
            self.range.start_age,
            moments.first[0],
            if healthy_life_only { "healthy" } else { "total" }
        );

        Ok(LifetimeEstimates {
            range: self.range,
            reward: RewardKind::from_healthy_flag(healthy_life_only),
            std: moments.std_dev(),
            mean: moments.first,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assumptions::CoefficientSet;
    use crate::data::ObservationRecord;
    use approx::assert_abs_diff_eq;

    fn observations() -> ObservationTable {
        let mut rows = Vec::new();
        for age in 70..=80u32 {
            for i in 0..4u8 {
                rows.push(ObservationRecord {
                    id: format!("{}-{}", age, i),
                    age,
                    income_decile: 2,
                    gender_flag: i % 2,
                    // one in four disabled at every age
                    disabled: if i == 0 { 1 } else { 0 },
                    age_at_event: age,
                    is_dead: 0,
                });
            }
        }
        ObservationTable::new(rows).unwrap()
    }

    fn estimator(coefficients: CoefficientSet) -> LongevityEstimator {
        LongevityEstimator::new(
            &observations(),
            MortalityModel::provided(coefficients),
            Gender::Female,
            2,
            EstimatorConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_estimates_cover_every_modeled_age() {
        let est = estimator(CoefficientSet::new(0.03, 0.0, 0.0));
        let out = est.compute_lifetime_estimates(false).unwrap();

        assert_eq!(est.age_range(), AgeRange::new(70, 81).unwrap());
        assert_eq!(out.mean.len(), 11);
        assert_eq!(out.std.len(), 11);
        assert_eq!(out.rows().first().map(|r| r.age), Some(70));
        assert_eq!(out.at_age(80).map(|r| r.mean), Some(out.mean[10]));
        assert!(out.at_age(81).is_none());
    }

    #[test]
    fn test_coin_flip_mortality_boundary_value() {
        let est = estimator(CoefficientSet::zeros());
        let out = est.compute_lifetime_estimates(false).unwrap();

        let last = out.at_age(80).unwrap();
        assert_abs_diff_eq!(last.mean, 1.5, epsilon = 1e-12);
        // every earlier age: 0.75 + 0.5 * next
        for age in 70..80 {
            let here = out.at_age(age).unwrap().mean;
            let next = out.at_age(age + 1).unwrap().mean;
            assert_abs_diff_eq!(here, 0.75 + 0.5 * next, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_healthy_life_is_shorter_than_total_life() {
        // roughly 2-3% annual mortality over the modeled ages
        let est = estimator(CoefficientSet::new(-0.05, 0.0, 0.0));
        let total = est.compute_lifetime_estimates(false).unwrap();
        let healthy = est.compute_lifetime_estimates(true).unwrap();

        assert_eq!(healthy.reward, RewardKind::HealthyLife);
        for (h, t) in healthy.mean.iter().zip(total.mean.iter()) {
            assert!(h < t, "healthy {} should be below total {}", h, t);
        }
    }

    #[test]
    fn test_prevalence_lookup() {
        let est = estimator(CoefficientSet::zeros());
        assert_abs_diff_eq!(est.prevalence(75).unwrap(), 1.0 / 3.0, epsilon = 1e-12);
        assert!(est.prevalence(95).is_err());

        let m = est.prevalence_matrix();
        assert_eq!(m.dim(), (12, 12));
        assert_abs_diff_eq!(m[[0, 0]], 2.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(m[[11, 0]], 1.0 - 1.0 / 6.0, epsilon = 1e-12);
        assert_eq!(m[[0, 11]], 1.0);
    }

    #[test]
    fn test_compute_up_dimensions() {
        let est = estimator(CoefficientSet::zeros());
        let m = est.compute_up().unwrap();
        assert_eq!(m.u().dim(), (11, 11));
        assert_eq!(m.p().dim(), (12, 12));
        assert_eq!(m.u()[[10, 10]], 0.5);
    }

    #[test]
    fn test_smoothed_curve_is_computed_once_and_indexed() {
        let config = EstimatorConfig {
            smoothing: PrevalenceSmoothing::Exponential,
            ..EstimatorConfig::default()
        };
        let est = LongevityEstimator::new(
            &observations(),
            MortalityModel::provided(CoefficientSet::zeros()),
            Gender::Male,
            2,
            config,
        )
        .unwrap();

        let curve = est.prevalence_curve();
        assert_eq!(curve.values().len(), 11);
        for (idx, age) in (70..81u32).enumerate() {
            assert_eq!(est.prevalence(age).unwrap(), curve.values()[idx]);
        }
        // flat raw prevalence fits a flat exponential
        assert_abs_diff_eq!(est.prevalence(78).unwrap(), 1.0 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_smoothing_failure_surfaces_at_construction() {
        let config = EstimatorConfig {
            smoothing: PrevalenceSmoothing::Exponential,
            ..EstimatorConfig::default()
        };
        // decile 9 has no observations, so its curve is all zeros
        let err = LongevityEstimator::new(
            &observations(),
            MortalityModel::provided(CoefficientSet::zeros()),
            Gender::Male,
            9,
            config,
        )
        .unwrap_err();
        assert!(matches!(err, LongevityError::Fit(_)));
    }

    #[test]
    fn test_extreme_coefficients_surface_numerical_error() {
        // sigmoid(-1000) underflows to an exact zero probability of death
        let est = estimator(CoefficientSet::new(-20.0, 0.0, 0.0));
        let err = est.compute_lifetime_estimates(false).unwrap_err();
        assert!(matches!(err, LongevityError::Numerical(_)));
    }
}
