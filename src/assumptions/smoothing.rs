//! Optional smoothing of the disability prevalence curve
//!
//! Survey cells at old ages are thin, so the raw curve is noisy. Smoothing
//! first fills zero gaps and then fits `a * exp(b * t)` by least squares,
//! with `t` measured in years from the first modeled age.

use log::debug;
use nalgebra::{Matrix2, Vector2};

use crate::error::{LongevityError, Result};

const MAX_LM_ITERATIONS: usize = 200;
const LM_TOLERANCE: f64 = 1e-12;

/// Prevalence values indexed by age starting at `start_age`
#[derive(Debug, Clone, PartialEq)]
pub struct PrevalenceCurve {
    start_age: u32,
    values: Vec<f64>,
}

impl PrevalenceCurve {
    pub fn new(start_age: u32, values: Vec<f64>) -> Self {
        Self { start_age, values }
    }

    pub fn start_age(&self) -> u32 {
        self.start_age
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, age: u32) -> Option<f64> {
        age.checked_sub(self.start_age)
            .and_then(|idx| self.values.get(idx as usize))
            .copied()
    }

    /// Replace zeros with the previous value; the first entry borrows the
    /// second
    pub fn fill_gaps(&self) -> Self {
        let mut filled = self.values.clone();
        for idx in 0..filled.len() {
            if filled[idx] != 0.0 {
                continue;
            }
            filled[idx] = match idx {
                0 => filled.get(1).copied().unwrap_or(0.0),
                _ => filled[idx - 1],
            };
        }
        Self::new(self.start_age, filled)
    }

    /// Gap-filled curve replaced by its least-squares exponential fit
    pub fn smooth_exponential(&self) -> Result<Self> {
        let filled = self.fill_gaps();
        let t: Vec<f64> = (0..filled.values.len()).map(|i| i as f64).collect();
        let (a, b) = fit_exponential(&t, &filled.values)?;
        debug!("exponential prevalence fit: a={:.6} b={:.6}", a, b);
        let values = t.iter().map(|&ti| a * (b * ti).exp()).collect();
        Ok(Self::new(self.start_age, values))
    }
}

fn sum_squares(t: &[f64], y: &[f64], a: f64, b: f64) -> f64 {
    t.iter()
        .zip(y)
        .map(|(&ti, &yi)| {
            let r = a * (b * ti).exp() - yi;
            r * r
        })
        .sum()
}

/// Least-squares fit of `y = a * exp(b * t)`
///
/// Starts from the log-linear fit over positive points and refines with
/// Levenberg-Marquardt.
fn fit_exponential(t: &[f64], y: &[f64]) -> Result<(f64, f64)> {
    let positive: Vec<(f64, f64)> = t
        .iter()
        .zip(y)
        .filter(|(_, yi)| **yi > 0.0)
        .map(|(&ti, &yi)| (ti, yi.ln()))
        .collect();
    if positive.len() < 2 {
        return Err(LongevityError::Fit(format!(
            "exponential smoothing needs two positive points, found {}",
            positive.len()
        )));
    }

    let n = positive.len() as f64;
    let mean_t = positive.iter().map(|(ti, _)| ti).sum::<f64>() / n;
    let mean_ln = positive.iter().map(|(_, li)| li).sum::<f64>() / n;
    let sxx: f64 = positive.iter().map(|(ti, _)| (ti - mean_t).powi(2)).sum();
    let sxy: f64 = positive
        .iter()
        .map(|(ti, li)| (ti - mean_t) * (li - mean_ln))
        .sum();
    let mut b = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    let mut a = (mean_ln - b * mean_t).exp();

    let mut lambda = 1e-3;
    let mut sse = sum_squares(t, y, a, b);

    for _ in 0..MAX_LM_ITERATIONS {
        let mut jtj = Matrix2::<f64>::zeros();
        let mut jtr = Vector2::<f64>::zeros();
        for (&ti, &yi) in t.iter().zip(y) {
            let e = (b * ti).exp();
            let r = a * e - yi;
            let j = Vector2::new(e, a * ti * e);
            jtj += j * j.transpose();
            jtr += j * r;
        }

        let mut damped = jtj;
        damped[(0, 0)] += lambda * jtj[(0, 0)];
        damped[(1, 1)] += lambda * jtj[(1, 1)];

        let Some(inverse) = damped.try_inverse() else {
            lambda *= 10.0;
            continue;
        };
        let delta = inverse * jtr;
        let (a_new, b_new) = (a - delta[0], b - delta[1]);
        let sse_new = sum_squares(t, y, a_new, b_new);

        if sse_new.is_finite() && sse_new <= sse {
            let improvement = sse - sse_new;
            a = a_new;
            b = b_new;
            sse = sse_new;
            lambda = (lambda / 10.0).max(1e-12);
            if improvement <= LM_TOLERANCE * (1.0 + sse) {
                break;
            }
        } else {
            lambda *= 10.0;
            if lambda > 1e12 {
                break;
            }
        }
    }

    if !(a.is_finite() && b.is_finite()) {
        return Err(LongevityError::Fit(
            "exponential smoothing diverged".to_string(),
        ));
    }
    Ok((a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_gaps_carries_previous_value() {
        let curve = PrevalenceCurve::new(65, vec![0.0, 0.2, 0.0, 0.0, 0.5, 0.0]);
        let filled = curve.fill_gaps();
        assert_eq!(filled.values(), &[0.2, 0.2, 0.2, 0.2, 0.5, 0.5]);
    }

    #[test]
    fn test_fill_gaps_first_entry_only_looks_one_ahead() {
        let curve = PrevalenceCurve::new(65, vec![0.0, 0.0, 0.3]);
        assert_eq!(curve.fill_gaps().values(), &[0.0, 0.0, 0.3]);

        let single = PrevalenceCurve::new(65, vec![0.0]);
        assert_eq!(single.fill_gaps().values(), &[0.0]);
    }

    #[test]
    fn test_exact_exponential_is_recovered() {
        let values: Vec<f64> = (0..20).map(|i| 0.05 * (0.08 * i as f64).exp()).collect();
        let curve = PrevalenceCurve::new(65, values.clone());

        let smoothed = curve.smooth_exponential().unwrap();
        for (s, v) in smoothed.values().iter().zip(&values) {
            assert!((s - v).abs() < 1e-9, "{} vs {}", s, v);
        }
    }

    #[test]
    fn test_noisy_curve_is_increasing_after_smoothing() {
        let noise = [0.01, -0.02, 0.015, 0.0, -0.01, 0.02, -0.015, 0.01];
        let values: Vec<f64> = noise
            .iter()
            .enumerate()
            .map(|(i, n)| 0.1 * (0.15 * i as f64).exp() + n)
            .collect();
        let smoothed = PrevalenceCurve::new(70, values).smooth_exponential().unwrap();

        assert!(smoothed.values().windows(2).all(|w| w[1] > w[0]));
        assert_eq!(smoothed.get(70), smoothed.values().first().copied());
    }

    #[test]
    fn test_all_zero_curve_cannot_be_smoothed() {
        let curve = PrevalenceCurve::new(65, vec![0.0; 10]);
        assert!(matches!(
            curve.smooth_exponential(),
            Err(LongevityError::Fit(_))
        ));
    }
}
