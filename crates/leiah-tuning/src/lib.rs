//! # leiah-tuning
//!
//! Hyperparameter-tuning support for Leiah.
//!
//! Resolves the declarative `hyperparameter_ranges` of a tuning job into typed
//! ranges (categorical, integer, continuous) and reads the tuning controls
//! (`max_jobs`, `max_parallel_jobs`, `objective_type`) that travel with them to
//! the estimator.

mod ranges;
mod tuning;

pub use ranges::{ParameterDef, ParameterRange, ParameterRanges, ScalingType};
pub use tuning::{ObjectiveType, TuningConfig, TuningRequest};
