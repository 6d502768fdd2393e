//! Absorbing Markov chain over single-year ages with death as the absorbing state

mod transition;
mod moments;
mod estimator;
pub mod reward;

pub use transition::{TransitionMatrices, TransitionMatrixBuilder};
pub use moments::{MomentEngine, RewardMoments};
pub use estimator::{LifetimeEstimates, LifetimeRow, LongevityEstimator};
pub use reward::RewardKind;
