//! Transition matrices of the absorbing age chain
//!
//! States `0..diff` are single-year ages starting at `start_age`; state
//! `diff` is death. Columns are "from" states, rows are "to" states, so every
//! column of `P` is a probability distribution.

use log::debug;
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::assumptions::{DeathProbability, MortalityModel};
use crate::data::{AgeRange, Gender};
use crate::error::{LongevityError, Result};

/// Tolerance used when validating caller-supplied matrices
const CONSISTENCY_TOLERANCE: f64 = 1e-12;

/// `U` (transient block) and `P` (augmented with the absorbing state)
#[derive(Debug, Clone)]
pub struct TransitionMatrices {
    range: AgeRange,
    u: Array2<f64>,
    p: Array2<f64>,
}

impl TransitionMatrices {
    /// Assemble `P` from one survival/death pair per modeled age
    ///
    /// Every age advances to the next one, except the final age whose
    /// survivors stay put: the open-ended top age group is a self-loop.
    pub fn from_probabilities(range: AgeRange, probabilities: &[DeathProbability]) -> Result<Self> {
        let diff = range.diff();
        if probabilities.len() != diff {
            return Err(LongevityError::dimension(
                "death probabilities",
                (diff, 1),
                (probabilities.len(), 1),
            ));
        }

        let mut p = Array2::<f64>::zeros((diff + 1, diff + 1));
        p[[diff, diff]] = 1.0;

        for (j, prob) in probabilities.iter().enumerate() {
            if j + 1 < diff {
                p[[j + 1, j]] = prob.p_alive;
            } else {
                p[[j, j]] = prob.p_alive;
            }
            p[[diff, j]] = prob.p_dead;
        }

        let u = p.slice(s![..diff, ..diff]).to_owned();
        Ok(Self { range, u, p })
    }

    /// Wrap externally built matrices after validating their shapes
    pub fn new(range: AgeRange, u: Array2<f64>, p: Array2<f64>) -> Result<Self> {
        let diff = range.diff();
        if u.dim() != (diff, diff) {
            return Err(LongevityError::dimension("U", (diff, diff), u.dim()));
        }
        if p.dim() != (diff + 1, diff + 1) {
            return Err(LongevityError::dimension("P", (diff + 1, diff + 1), p.dim()));
        }
        let block = p.slice(s![..diff, ..diff]);
        let mismatch = u
            .iter()
            .zip(block.iter())
            .any(|(a, b)| (a - b).abs() > CONSISTENCY_TOLERANCE);
        if mismatch {
            return Err(LongevityError::InvalidInput(
                "U must equal the transient block of P".to_string(),
            ));
        }
        Ok(Self { range, u, p })
    }

    pub fn age_range(&self) -> AgeRange {
        self.range
    }

    pub fn diff(&self) -> usize {
        self.range.diff()
    }

    /// Transient-to-transient matrix, `diff x diff`
    pub fn u(&self) -> &Array2<f64> {
        &self.u
    }

    /// Augmented matrix, `(diff + 1) x (diff + 1)`
    pub fn p(&self) -> &Array2<f64> {
        &self.p
    }

    /// Columns of `P` leaving transient states, `(diff + 1) x diff`
    pub fn transient_columns(&self) -> ArrayView2<'_, f64> {
        self.p.slice(s![.., ..self.diff()])
    }

    /// Probability of absorption from each transient state
    pub fn death_probabilities(&self) -> ArrayView1<'_, f64> {
        let diff = self.diff();
        self.p.slice(s![diff, ..diff])
    }

    pub fn column_sums(&self) -> Array1<f64> {
        self.p.sum_axis(Axis(0))
    }
}

/// Builds the chain for one gender and income decile from a mortality model
pub struct TransitionMatrixBuilder<'a> {
    model: &'a MortalityModel,
    range: AgeRange,
}

impl<'a> TransitionMatrixBuilder<'a> {
    pub fn new(model: &'a MortalityModel, range: AgeRange) -> Self {
        Self { model, range }
    }

    pub fn build(&self, gender: Gender, income_decile: u32) -> Result<TransitionMatrices> {
        let probabilities = self
            .range
            .ages()
            .map(|age| self.model.probability_of_death(age, gender, income_decile))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "built {}x{} transition matrix for {} decile {} (ages {}..{})",
            self.range.diff() + 1,
            self.range.diff() + 1,
            gender.as_str(),
            income_decile,
            self.range.start_age,
            self.range.end_age
        );

        TransitionMatrices::from_probabilities(self.range, &probabilities)
    }
}
