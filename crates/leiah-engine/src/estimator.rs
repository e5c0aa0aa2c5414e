//! The estimator contract: what a job hands to an estimator when building it,
//! and what it asks of the estimator when running.

use leiah_tuning::TuningRequest;
use leiah_types::{
    descriptor_error, string_field, parameters_section, value_kind, DescriptorError,
    EstimatorError, EstimatorResult, Parameters,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Submits work to a training backend on behalf of one job.
///
/// An estimator is built once per job and used once: training jobs call
/// [`Estimator::fit`], tuning jobs call [`Estimator::tune`]. Implementations
/// that only support one of the two leave the other at its default, which
/// reports the operation as unsupported.
pub trait Estimator: std::fmt::Debug + Send + Sync {
    /// Submit a training job.
    fn fit(&self) -> EstimatorResult<()> {
        Err(EstimatorError::Unsupported {
            operation: "fit".to_string(),
        })
    }

    /// Submit a hyperparameter-tuning job over `request`'s ranges.
    fn tune(&self, _request: &TuningRequest) -> EstimatorResult<()> {
        Err(EstimatorError::Unsupported {
            operation: "tune".to_string(),
        })
    }
}

/// The `estimator` block of a model or job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatorSpec {
    /// Dotted identifier the estimator is registered under.
    pub classname: String,
    /// Estimator-specific properties.
    pub properties: Parameters,
}

impl EstimatorSpec {
    pub fn new(classname: impl Into<String>) -> Self {
        Self {
            classname: classname.into(),
            properties: Parameters::new(),
        }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    /// Read the optional `estimator` block of `data`.
    ///
    /// The block is either `{classname, properties}` or a bare classname
    /// string, as older descriptors wrote it.
    pub fn from_section(data: &Parameters, owner: &str) -> Result<Option<Self>, DescriptorError> {
        match data.get("estimator") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(classname)) => Ok(Some(Self::new(classname.as_str()))),
            Some(Value::Object(block)) => {
                let owner = format!("the estimator of {owner}");
                let classname = string_field(block, "classname", &owner)?
                    .ok_or_else(|| descriptor_error!("{} is missing \"classname\"", owner))?;
                let properties = parameters_section(block, "properties", &owner)?;
                Ok(Some(Self {
                    classname,
                    properties,
                }))
            }
            Some(other) => Err(descriptor_error!(
                "\"estimator\" of {} must be a mapping or a classname, found {}",
                owner,
                value_kind(other)
            )),
        }
    }
}

/// Arguments every estimator factory is called with.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimatorArgs {
    /// Identifier the estimator was requested under.
    pub classname: String,
    /// Name of the owning model.
    pub model: String,
    /// Identifier of the owning job.
    pub job: String,
    /// Hyperparameters after model/job merging.
    pub hyperparameters: Parameters,
    /// Properties of the estimator block in effect for the job.
    pub properties: Parameters,
}

impl EstimatorArgs {
    /// Name the backend should give submitted jobs: `<model>-<job>`.
    pub fn training_job_name(&self) -> String {
        format!("{}-{}", self.model, self.job)
    }

    /// Deserialize the properties into the estimator's own settings type.
    ///
    /// Unknown, missing or mistyped properties become a construction error
    /// naming the estimator.
    pub fn properties<T: DeserializeOwned>(&self) -> EstimatorResult<T> {
        serde_json::from_value(Value::Object(self.properties.clone())).map_err(|e| {
            EstimatorError::Construction {
                classname: self.classname.clone(),
                message: e.to_string(),
            }
        })
    }
}
