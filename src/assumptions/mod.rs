//! Estimation assumptions: one-year mortality and disability prevalence

mod mortality;
mod prevalence;
mod smoothing;
pub mod logistic;

pub use mortality::{sigmoid, CoefficientSet, DeathProbability, FittedMortality, MortalityModel};
pub use prevalence::{CellCounts, PrevalenceCell, PrevalenceTable};
pub use smoothing::PrevalenceCurve;
pub use logistic::{FeatureScaler, LogisticClassifier};
