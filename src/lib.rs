//! Longevity - healthy and total life expectancy from survey panel data
//!
//! This library provides:
//! - Disability prevalence tables by age and income decile
//! - One-year mortality from a fitted logistic model or supplied coefficients
//! - An absorbing Markov chain with rewards for the first three moments of
//!   remaining (healthy) years
//! - Gini and Theil indices across income groups
//! - A parallel runner over every gender and income decile

pub mod assumptions;
pub mod config;
pub mod data;
pub mod error;
pub mod inequality;
pub mod markov;
pub mod scenario;

// Re-export commonly used types
pub use assumptions::{CoefficientSet, MortalityModel, PrevalenceTable};
pub use config::EstimatorConfig;
pub use data::{Gender, ObservationTable, PanelTable};
pub use error::{LongevityError, Result};
pub use inequality::{gini, theil};
pub use markov::{LifetimeEstimates, LongevityEstimator, MomentEngine, TransitionMatrixBuilder};
pub use scenario::{InequalitySummary, SubgroupEstimate, SubgroupRunner};
