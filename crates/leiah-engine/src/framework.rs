//! Built-in script-mode framework estimator and the backend it submits to.

use leiah_tuning::TuningRequest;
use leiah_types::{EstimatorResult, Parameters};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::estimator::{Estimator, EstimatorArgs};
use crate::registry::EstimatorRegistry;

/// Properties accepted by [`FrameworkEstimator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrameworkProperties {
    /// Script the training container runs.
    pub entry_point: String,
    /// Instance type of each training node.
    pub train_instance_type: String,
    /// Execution role assumed by the backend.
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub source_dir: Option<String>,
    #[serde(default)]
    pub model_uri: Option<String>,
    #[serde(default)]
    pub model_dir: Option<String>,
    #[serde(default)]
    pub code_location: Option<String>,
    #[serde(default)]
    pub output_path: Option<String>,
    /// Maximum run time, in seconds.
    #[serde(default = "default_train_max_run")]
    pub train_max_run: u64,
    #[serde(default = "default_py_version")]
    pub py_version: String,
    #[serde(default = "default_framework_version")]
    pub framework_version: String,
    #[serde(default = "default_one")]
    pub train_instance_count: u32,
    /// Volume size per node, in GB.
    #[serde(default = "default_train_volume_size")]
    pub train_volume_size: u32,
    #[serde(default)]
    pub debugger_hook_config: bool,
}

fn default_train_max_run() -> u64 {
    86_400
}

fn default_py_version() -> String {
    "py37".to_string()
}

fn default_framework_version() -> String {
    "2.3.0".to_string()
}

fn default_one() -> u32 {
    1
}

fn default_train_volume_size() -> u32 {
    10
}

/// A fully described training submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingJobRequest {
    /// Base job name, `<model>-<job>`.
    pub job_name: String,
    /// Framework label, e.g. "tensorflow".
    pub framework: String,
    pub hyperparameters: Parameters,
    pub properties: FrameworkProperties,
}

/// The external platform that runs submitted jobs.
pub trait TrainingBackend: std::fmt::Debug + Send + Sync {
    fn submit_training(&self, request: &TrainingJobRequest) -> EstimatorResult<()>;

    fn submit_tuning(
        &self,
        request: &TrainingJobRequest,
        tuning: &TuningRequest,
    ) -> EstimatorResult<()>;
}

/// Backend that only logs what it would submit.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunBackend;

impl TrainingBackend for DryRunBackend {
    fn submit_training(&self, request: &TrainingJobRequest) -> EstimatorResult<()> {
        info!(
            "[dry-run] training job \"{}\" ({} {}, {} x {}) hyperparameters: {}",
            request.job_name,
            request.framework,
            request.properties.framework_version,
            request.properties.train_instance_count,
            request.properties.train_instance_type,
            serde_json::Value::Object(request.hyperparameters.clone())
        );
        Ok(())
    }

    fn submit_tuning(
        &self,
        request: &TrainingJobRequest,
        tuning: &TuningRequest,
    ) -> EstimatorResult<()> {
        info!(
            "[dry-run] tuning job \"{}\" ({}) over {} ranges, max_jobs={} max_parallel_jobs={} objective={}",
            request.job_name,
            request.framework,
            tuning.hyperparameter_ranges.len(),
            tuning.max_jobs,
            tuning.max_parallel_jobs,
            tuning.objective_type
        );
        Ok(())
    }
}

/// Estimator for script-mode framework containers (TensorFlow, PyTorch, ...).
#[derive(Debug)]
pub struct FrameworkEstimator {
    request: TrainingJobRequest,
    backend: Arc<dyn TrainingBackend>,
}

impl FrameworkEstimator {
    pub fn new(
        framework: &str,
        args: &EstimatorArgs,
        backend: Arc<dyn TrainingBackend>,
    ) -> EstimatorResult<Self> {
        let properties: FrameworkProperties = args.properties()?;
        Ok(Self {
            request: TrainingJobRequest {
                job_name: args.training_job_name(),
                framework: framework.to_string(),
                hyperparameters: args.hyperparameters.clone(),
                properties,
            },
            backend,
        })
    }

    pub fn request(&self) -> &TrainingJobRequest {
        &self.request
    }
}

impl Estimator for FrameworkEstimator {
    fn fit(&self) -> EstimatorResult<()> {
        self.backend.submit_training(&self.request)
    }

    fn tune(&self, request: &TuningRequest) -> EstimatorResult<()> {
        self.backend.submit_tuning(&self.request, request)
    }
}

/// Register a [`FrameworkEstimator`] for `framework` under `classname`.
pub fn register_framework(
    registry: &mut EstimatorRegistry,
    classname: &str,
    framework: &'static str,
    backend: Arc<dyn TrainingBackend>,
) {
    registry.register(classname, move |args| {
        let estimator = FrameworkEstimator::new(framework, &args, backend.clone())?;
        Ok(Box::new(estimator) as Box<dyn Estimator>)
    });
}
