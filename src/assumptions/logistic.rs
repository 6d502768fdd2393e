//! Regularized logistic regression for one-year mortality
//!
//! L2 penalty with `C = 1` and an unpenalized intercept. Features are divided
//! by their standard deviation without mean-centering, so raw ages can be fed
//! straight into `predict_proba`.

use log::{debug, warn};
use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use super::mortality::{sigmoid, DeathProbability};
use crate::config::FitOptions;
use crate::data::PanelTable;
use crate::error::{LongevityError, Result};

/// Feature order used by the design matrix
pub const FEATURE_NAMES: [&str; 3] = ["age", "income_decile", "gender_flag"];

const N_FEATURES: usize = 3;

/// Step-halving attempts before a Newton step is accepted as-is
const MAX_LINE_SEARCH_STEPS: usize = 30;

/// Divides each feature by its population standard deviation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaler {
    scale: [f64; N_FEATURES],
}

impl FeatureScaler {
    /// Zero-variance columns keep a scale of 1
    pub fn fit(x: &Array2<f64>) -> Self {
        let mut scale = [1.0; N_FEATURES];
        for (k, column) in x.axis_iter(Axis(1)).enumerate().take(N_FEATURES) {
            let std = column.std(0.0);
            if std.is_finite() && std > 0.0 {
                scale[k] = std;
            }
        }
        Self { scale }
    }

    pub fn scale(&self) -> &[f64; N_FEATURES] {
        &self.scale
    }

    pub fn transform(&self, row: [f64; N_FEATURES]) -> [f64; N_FEATURES] {
        let mut out = row;
        for (value, s) in out.iter_mut().zip(self.scale.iter()) {
            *value /= s;
        }
        out
    }
}

/// Fitted logistic classifier for the `y = died next year` label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticClassifier {
    scaler: FeatureScaler,
    intercept: f64,
    /// Coefficients on the scaled features, in `FEATURE_NAMES` order
    weights: [f64; N_FEATURES],
    iterations: usize,
    converged: bool,
}

impl LogisticClassifier {
    /// Fit on the full panel table
    pub fn fit(panel: &PanelTable, options: &FitOptions) -> Result<Self> {
        if panel.distinct_labels() < 2 {
            return Err(LongevityError::Fit(format!(
                "label column needs two distinct classes, found {} across {} rows",
                panel.distinct_labels(),
                panel.len()
            )));
        }
        if !(options.penalty_c.is_finite() && options.penalty_c > 0.0) {
            return Err(LongevityError::Fit(format!(
                "penalty_c must be positive, got {}",
                options.penalty_c
            )));
        }

        let n = panel.len();
        let raw = Array2::from_shape_fn((n, N_FEATURES), |(i, k)| {
            let record = &panel.records()[i];
            match k {
                0 => record.age as f64,
                1 => record.income_decile as f64,
                _ => record.gender_flag as f64,
            }
        });
        let y = Array1::from_iter(panel.records().iter().map(|r| r.y as f64));

        let scaler = FeatureScaler::fit(&raw);

        // Design matrix with a leading intercept column
        let mut design = Array2::<f64>::ones((n, N_FEATURES + 1));
        for i in 0..n {
            for k in 0..N_FEATURES {
                design[[i, k + 1]] = raw[[i, k]] / scaler.scale[k];
            }
        }

        let c = options.penalty_c;
        let mut beta = Array1::<f64>::zeros(N_FEATURES + 1);
        let mut objective = penalized_loss(&design, &y, &beta, c);
        let mut converged = false;
        let mut iterations = 0;

        while iterations < options.max_iterations {
            iterations += 1;

            let p = design.dot(&beta).mapv(sigmoid);
            let residual = &p - &y;

            let mut gradient = design.t().dot(&residual) * c;
            for k in 1..=N_FEATURES {
                gradient[k] += beta[k];
            }

            let weights = p.mapv(|pi| pi * (1.0 - pi));
            let weighted = &design * &weights.view().insert_axis(Axis(1));
            let mut hessian = design.t().dot(&weighted) * c;
            for k in 1..=N_FEATURES {
                hessian[[k, k]] += 1.0;
            }

            let step = solve_newton(&hessian, &gradient)?;

            let mut t = 1.0;
            let mut candidate = &beta - &(&step * t);
            let mut candidate_objective = penalized_loss(&design, &y, &candidate, c);
            let mut halvings = 0;
            while candidate_objective > objective && halvings < MAX_LINE_SEARCH_STEPS {
                t *= 0.5;
                candidate = &beta - &(&step * t);
                candidate_objective = penalized_loss(&design, &y, &candidate, c);
                halvings += 1;
            }

            let max_change = step.iter().fold(0.0_f64, |acc, s| acc.max((s * t).abs()));
            beta = candidate;
            objective = candidate_objective;

            if !beta.iter().all(|b| b.is_finite()) {
                return Err(LongevityError::Fit(
                    "Newton iterations produced non-finite coefficients".to_string(),
                ));
            }

            if max_change < options.tolerance {
                converged = true;
                break;
            }
        }

        if converged {
            debug!(
                "logistic mortality fit converged in {} iterations (loss {:.6})",
                iterations, objective
            );
            for (name, w) in FEATURE_NAMES.iter().zip(beta.iter().skip(1)) {
                debug!("  {} = {:.6} (scaled)", name, w);
            }
        } else {
            warn!(
                "logistic mortality fit did not converge within {} iterations",
                options.max_iterations
            );
        }

        Ok(Self {
            scaler,
            intercept: beta[0],
            weights: [beta[1], beta[2], beta[3]],
            iterations,
            converged,
        })
    }

    /// Probability of surviving / dying within a year for one raw feature row
    pub fn predict_proba(&self, age: u32, income_decile: u32, gender_flag: u8) -> DeathProbability {
        let row = self
            .scaler
            .transform([age as f64, income_decile as f64, gender_flag as f64]);
        let z = self.intercept
            + row
                .iter()
                .zip(self.weights.iter())
                .map(|(x, w)| x * w)
                .sum::<f64>();
        DeathProbability::from_p_dead(sigmoid(z))
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn weights(&self) -> &[f64; N_FEATURES] {
        &self.weights
    }

    pub fn scaler(&self) -> &FeatureScaler {
        &self.scaler
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn converged(&self) -> bool {
        self.converged
    }
}

/// 0.5 * ||w||^2 + C * sum(log(1 + e^z) - y * z)
fn penalized_loss(design: &Array2<f64>, y: &Array1<f64>, beta: &Array1<f64>, c: f64) -> f64 {
    let z = design.dot(beta);
    let data_term: f64 = z
        .iter()
        .zip(y.iter())
        .map(|(&zi, &yi)| softplus(zi) - yi * zi)
        .sum();
    let penalty: f64 = beta.iter().skip(1).map(|b| b * b).sum::<f64>() * 0.5;
    penalty + c * data_term
}

fn softplus(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

fn solve_newton(hessian: &Array2<f64>, gradient: &Array1<f64>) -> Result<Array1<f64>> {
    let dim = gradient.len();
    let h = DMatrix::from_fn(dim, dim, |i, j| hessian[[i, j]]);
    let g = DVector::from_iterator(dim, gradient.iter().copied());

    let solution = match h.clone().cholesky() {
        Some(chol) => chol.solve(&g),
        None => h.lu().solve(&g).ok_or_else(|| {
            LongevityError::Fit("singular Hessian in logistic fit".to_string())
        })?,
    };
    Ok(Array1::from_iter(solution.iter().copied()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PanelRecord;

    /// Deterministic panel where the death rate rises with age and is higher for men
    fn synthetic_panel() -> PanelTable {
        let mut records = Vec::new();
        for age in 60..=90u32 {
            for gender_flag in 0..=1u8 {
                let rate = sigmoid(-9.0 + 0.09 * age as f64 - 0.4 * gender_flag as f64);
                let deaths = (rate * 200.0).round() as usize;
                for i in 0..200 {
                    records.push(PanelRecord {
                        age,
                        income_decile: (i % 10) as u32,
                        gender_flag,
                        y: if i < deaths { 1 } else { 0 },
                    });
                }
            }
        }
        PanelTable::new(records).unwrap()
    }

    #[test]
    fn test_single_class_panel_fails() {
        let panel = PanelTable::new(vec![
            PanelRecord { age: 70, income_decile: 1, gender_flag: 0, y: 0 },
            PanelRecord { age: 71, income_decile: 2, gender_flag: 1, y: 0 },
        ])
        .unwrap();

        let err = LogisticClassifier::fit(&panel, &FitOptions::default()).unwrap_err();
        assert!(matches!(err, LongevityError::Fit(_)));
    }

    #[test]
    fn test_fit_recovers_age_and_gender_effects() {
        let panel = synthetic_panel();
        let clf = LogisticClassifier::fit(&panel, &FitOptions::default()).unwrap();

        assert!(clf.converged());
        assert!(clf.weights()[0] > 0.0, "age effect should be positive");
        assert!(clf.weights()[2] < 0.0, "female effect should be negative");

        let young = clf.predict_proba(62, 4, 0);
        let old = clf.predict_proba(88, 4, 0);
        assert!(old.p_dead > young.p_dead);
        assert!((young.p_alive + young.p_dead - 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_unpenalized_intercept_matches_mean_rate() {
        // At the optimum the intercept score equation forces sum(p - y) = 0
        let panel = synthetic_panel();
        let clf = LogisticClassifier::fit(&panel, &FitOptions::default()).unwrap();

        let n = panel.len() as f64;
        let observed: f64 = panel.records().iter().map(|r| r.y as f64).sum::<f64>() / n;
        let predicted: f64 = panel
            .records()
            .iter()
            .map(|r| clf.predict_proba(r.age, r.income_decile, r.gender_flag).p_dead)
            .sum::<f64>()
            / n;

        assert!((observed - predicted).abs() < 1e-6, "{} vs {}", observed, predicted);
    }

    #[test]
    fn test_scaler_divides_by_std_without_centering() {
        let x = ndarray::array![[60.0, 1.0, 0.0], [70.0, 1.0, 1.0], [80.0, 1.0, 0.0]];
        let scaler = FeatureScaler::fit(&x);

        let expected_age_std = (200.0_f64 / 3.0).sqrt();
        assert!((scaler.scale()[0] - expected_age_std).abs() < 1e-12);
        // constant column keeps unit scale
        assert_eq!(scaler.scale()[1], 1.0);

        let row = scaler.transform([70.0, 1.0, 1.0]);
        assert!((row[0] - 70.0 / expected_age_std).abs() < 1e-12);
    }
}
