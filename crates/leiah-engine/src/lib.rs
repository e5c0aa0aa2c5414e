//! # leiah-engine
//!
//! Resolves a YAML job descriptor into models and jobs, and runs them.
//!
//! A descriptor lists models; each model owns training jobs and
//! hyperparameter-tuning jobs. Hyperparameters and the estimator block set on
//! a model are inherited by its jobs, which may override them. Every job is
//! backed by an [`Estimator`] built through an [`EstimatorRegistry`] from the
//! dotted identifier the descriptor names.
//!
//! ```no_run
//! use std::sync::Arc;
//! use leiah_engine::{register_framework, Descriptor, DryRunBackend, EstimatorRegistry};
//!
//! let mut registry = EstimatorRegistry::new();
//! let backend = Arc::new(DryRunBackend);
//! register_framework(&mut registry, "leiah.estimators.TensorFlow", "tensorflow", backend);
//!
//! let descriptor = Descriptor::create("descriptor.yaml", &registry)?;
//! descriptor.process("model-01.1")?;
//! # Ok::<(), leiah_engine::LeiahError>(())
//! ```

pub mod descriptor;
pub mod estimator;
pub mod framework;
pub mod job;
pub mod model;
pub mod registry;

pub use descriptor::{Descriptor, DescriptorSource, Selector};
pub use estimator::{Estimator, EstimatorArgs, EstimatorSpec};
pub use framework::{
    register_framework, DryRunBackend, FrameworkEstimator, FrameworkProperties, TrainingBackend,
    TrainingJobRequest,
};
pub use job::{Job, JobKind, JobType};
pub use model::{Model, ModelDefaults};
pub use registry::{EstimatorFactory, EstimatorRegistry};

pub use leiah_tuning::{ObjectiveType, ParameterRange, ParameterRanges, ScalingType, TuningRequest};
pub use leiah_types::{LeiahError, LeiahResult, Parameters};
