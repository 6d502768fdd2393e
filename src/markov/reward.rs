//! Reward matrices accumulated along the chain
//!
//! Both matrices are `(diff + 1) x (diff + 1)` and share the layout of `P`:
//! entry `[i, j]` is the reward earned on the transition from state `j` to
//! state `i`.

use ndarray::Array2;

/// Reward attached to a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardKind {
    /// Every year alive counts, the year of death counts half
    TotalLife,
    /// Years are weighted by the share spent free of disability
    HealthyLife,
}

impl RewardKind {
    pub fn from_healthy_flag(healthy_life_only: bool) -> Self {
        if healthy_life_only {
            RewardKind::HealthyLife
        } else {
            RewardKind::TotalLife
        }
    }
}

/// 1 for alive -> alive, 0.5 for alive -> dead, 0 out of the absorbing state
pub fn total_life_reward(diff: usize) -> Array2<f64> {
    Array2::from_shape_fn((diff + 1, diff + 1), |(i, j)| {
        if j == diff {
            0.0
        } else if i == diff {
            0.5
        } else {
            1.0
        }
    })
}

/// Healthy-year reward built from the prevalence of each modeled age
///
/// With `m` the prevalence curve extended by a trailing zero for the
/// absorbing state, transient rows hold `1 - m[j]` and the absorbing row
/// holds `1 - m[j] / 2`.
pub fn healthy_life_reward(prevalence: &[f64]) -> Array2<f64> {
    let diff = prevalence.len();
    let m = |j: usize| if j < diff { prevalence[j] } else { 0.0 };
    Array2::from_shape_fn((diff + 1, diff + 1), |(i, j)| {
        if i == diff {
            1.0 - m(j) / 2.0
        } else {
            1.0 - m(j)
        }
    })
}
