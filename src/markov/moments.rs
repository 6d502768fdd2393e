//! Moments of reward accumulated until absorption (Caswell & Zarulli 2018)
//!
//! With `N = (I - U)^-1`, `Z = [I | 0]` and `1` a column of ones:
//!
//! ```text
//! rho1 = N' Z (P o R1)' 1
//! rho2 = N' [ Z (P o R2)' 1 + 2 (U o R1~)' rho1 ]
//! rho3 = N' [ Z (P o R3)' 1 + 3 (U o R2~)' rho1 + 3 (U o R1~)' rho2 ]
//! ```
//!
//! where `o` is the Hadamard product and `Rk~ = Z Rk Z'`.

use log::debug;
use nalgebra::DMatrix;
use ndarray::{Array1, Array2};

use super::transition::TransitionMatrices;
use crate::error::{LongevityError, Result};

/// First three moments of accumulated reward, indexed by starting age
#[derive(Debug, Clone, PartialEq)]
pub struct RewardMoments {
    pub first: Array1<f64>,
    pub second: Array1<f64>,
    pub third: Array1<f64>,
}

impl RewardMoments {
    /// `rho2 - rho1^2`, elementwise
    pub fn variance(&self) -> Array1<f64> {
        &self.second - &self.first.mapv(|m| m * m)
    }

    /// Square root of the variance; rounding noise below zero is clamped
    pub fn std_dev(&self) -> Array1<f64> {
        self.variance().mapv(|v| v.max(0.0).sqrt())
    }
}

/// Fundamental matrix and moment recursion for one set of transition matrices
#[derive(Debug, Clone)]
pub struct MomentEngine<'a> {
    matrices: &'a TransitionMatrices,
    fundamental: Array2<f64>,
}

impl<'a> MomentEngine<'a> {
    /// Invert `I - U`
    ///
    /// Every transient state must have a positive probability of death,
    /// otherwise the chain is not absorbing and `N` is undefined.
    pub fn new(matrices: &'a TransitionMatrices, singularity_tolerance: f64) -> Result<Self> {
        let range = matrices.age_range();
        if let Some((idx, q)) = matrices
            .death_probabilities()
            .iter()
            .enumerate()
            .find(|(_, q)| !(**q > 0.0))
        {
            return Err(LongevityError::Numerical(format!(
                "probability of death at age {} is {}, fundamental matrix undefined",
                range.start_age + idx as u32,
                q
            )));
        }

        let diff = matrices.diff();
        let i_minus_u = Array2::<f64>::eye(diff) - matrices.u();
        let lu = DMatrix::from_fn(diff, diff, |i, j| i_minus_u[[i, j]]).lu();

        let det = lu.determinant();
        if !det.is_finite() || det.abs() < singularity_tolerance {
            return Err(LongevityError::Numerical(format!(
                "I - U is singular (determinant {:e})",
                det
            )));
        }
        let inverse = lu
            .try_inverse()
            .ok_or_else(|| LongevityError::Numerical("I - U is not invertible".to_string()))?;

        let fundamental = Array2::from_shape_fn((diff, diff), |(i, j)| inverse[(i, j)]);
        if fundamental.iter().any(|v| !v.is_finite()) {
            return Err(LongevityError::Numerical(
                "fundamental matrix has non-finite entries".to_string(),
            ));
        }

        debug!("fundamental matrix {}x{} (det(I - U) = {:e})", diff, diff, det);
        Ok(Self {
            matrices,
            fundamental,
        })
    }

    /// `N`: expected visits to state `i` starting from state `j`
    pub fn fundamental(&self) -> &Array2<f64> {
        &self.fundamental
    }

    /// `Z = [I | 0]`, projecting augmented vectors onto transient states
    pub fn projection(&self) -> Array2<f64> {
        let diff = self.matrices.diff();
        Array2::from_shape_fn((diff, diff + 1), |(i, j)| if i == j { 1.0 } else { 0.0 })
    }

    /// Moments with the same reward matrix used at every order
    pub fn compute_moments(&self, reward: &Array2<f64>) -> Result<RewardMoments> {
        self.compute_moments_with(reward, reward, reward)
    }

    /// Moments with separate reward matrices for each order
    pub fn compute_moments_with(
        &self,
        r1: &Array2<f64>,
        r2: &Array2<f64>,
        r3: &Array2<f64>,
    ) -> Result<RewardMoments> {
        let diff = self.matrices.diff();
        for (what, r) in [("R1", r1), ("R2", r2), ("R3", r3)] {
            if r.dim() != (diff + 1, diff + 1) {
                return Err(LongevityError::dimension(what, (diff + 1, diff + 1), r.dim()));
            }
        }

        let p = self.matrices.p();
        let u = self.matrices.u();
        let n_t = self.fundamental.t();
        let z = self.projection();
        let ones = Array1::<f64>::ones(diff + 1);

        let expected_step = |r: &Array2<f64>| z.dot(&(p * r).t().dot(&ones));

        let rho1 = n_t.dot(&expected_step(r1));

        let r1_tilde = z.dot(r1).dot(&z.t());
        let rho2 = n_t.dot(&(expected_step(r2) + (u * &r1_tilde).t().dot(&rho1) * 2.0));

        let r2_tilde = z.dot(r2).dot(&z.t());
        let rho3 = n_t.dot(
            &(expected_step(r3)
                + (u * &r2_tilde).t().dot(&rho1) * 3.0
                + (u * &r1_tilde).t().dot(&rho2) * 3.0),
        );

        Ok(RewardMoments {
            first: rho1,
            second: rho2,
            third: rho3,
        })
    }
}
