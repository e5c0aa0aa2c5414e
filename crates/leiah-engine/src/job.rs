//! Jobs: the runnable units a model owns.

use leiah_tuning::{ParameterRanges, TuningConfig, TuningRequest};
use leiah_types::{
    descriptor_error, display_value, merge_parameters, parameters_section, string_field,
    value_kind, DescriptorError, LeiahResult, Parameters,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::{debug, info, warn};

use crate::estimator::{Estimator, EstimatorArgs, EstimatorSpec};
use crate::model::ModelDefaults;
use crate::registry::EstimatorRegistry;

/// The `type` of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Training,
    Tuning,
}

impl JobType {
    pub fn parse(value: &str) -> Result<Self, DescriptorError> {
        match value {
            "training" => Ok(Self::Training),
            "tuning" => Ok(Self::Tuning),
            other => Err(DescriptorError::UnsupportedJobType {
                job_type: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Training => f.write_str("training"),
            Self::Tuning => f.write_str("tuning"),
        }
    }
}

/// What running the job does.
#[derive(Debug, Clone, PartialEq)]
pub enum JobKind {
    /// Calls the estimator's `fit`.
    Training,
    /// Calls the estimator's `tune` with the resolved ranges and controls.
    Tuning(TuningRequest),
}

/// One runnable unit of a model.
///
/// Everything is resolved when the job is built: hyperparameters are merged,
/// the estimator is constructed and, for tuning jobs, ranges are validated.
/// A job is never modified afterwards.
#[derive(Debug)]
pub struct Job {
    model: String,
    identifier: String,
    description: Option<String>,
    hyperparameters: Parameters,
    estimator_spec: EstimatorSpec,
    estimator: Box<dyn Estimator>,
    kind: JobKind,
}

impl Job {
    /// Build the job `identifier` of `model` from its descriptor data.
    ///
    /// `default_type` applies when the job does not declare a `type`; it
    /// depends on the section the job was declared in.
    pub fn new(
        model: &ModelDefaults,
        identifier: impl Into<String>,
        data: &Value,
        default_type: JobType,
        registry: &EstimatorRegistry,
    ) -> LeiahResult<Self> {
        let identifier = identifier.into();
        let owner = format!("job \"{}.{}\"", model.name, identifier);

        let empty = Parameters::new();
        let data = match data {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => {
                return Err(descriptor_error!(
                    "{} must be a mapping, found {}",
                    owner,
                    value_kind(other)
                )
                .into())
            }
        };

        let job_type = match data.get("type") {
            None | Some(Value::Null) => default_type,
            Some(value) => JobType::parse(&display_value(value))?,
        };
        let description = string_field(data, "description", &owner)?;

        let hyperparameters = merge_parameters(
            &model.hyperparameters,
            &parameters_section(data, "hyperparameters", &owner)?,
        );

        // A job-level block replaces the model's block as a whole.
        let estimator_spec = match EstimatorSpec::from_section(data, &owner)? {
            Some(spec) => spec,
            None => model
                .estimator
                .clone()
                .ok_or_else(|| DescriptorError::MissingEstimator {
                    model: model.name.clone(),
                    job: identifier.clone(),
                })?,
        };

        let estimator = registry.construct(EstimatorArgs {
            classname: estimator_spec.classname.clone(),
            model: model.name.clone(),
            job: identifier.clone(),
            hyperparameters: hyperparameters.clone(),
            properties: estimator_spec.properties.clone(),
        })?;

        let kind = match job_type {
            JobType::Training => JobKind::Training,
            JobType::Tuning => {
                let ranges = ParameterRanges::resolve(&parameters_section(
                    data,
                    "hyperparameter_ranges",
                    &owner,
                )?)?;
                let config = TuningConfig::from_job_data(data, &owner)?;
                let request = TuningRequest::new(ranges, config);

                if request.hyperparameter_ranges.is_empty() {
                    warn!("Tuning {} declares no hyperparameter ranges", owner);
                } else if request.exceeds_search_space() {
                    warn!(
                        "Tuning {} allows {} jobs but its ranges only have {} combinations",
                        owner,
                        request.max_jobs,
                        request.hyperparameter_ranges.grid_size().unwrap_or_default()
                    );
                }
                JobKind::Tuning(request)
            }
        };

        debug!(
            "Built {} {} with estimator \"{}\" and {} hyperparameters",
            job_type,
            owner,
            estimator_spec.classname,
            hyperparameters.len()
        );

        Ok(Self {
            model: model.name.clone(),
            identifier,
            description,
            hyperparameters,
            estimator_spec,
            estimator,
            kind,
        })
    }

    /// Name of the owning model.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// `<model>.<job>`, the selector that targets exactly this job.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.model, self.identifier)
    }

    /// `<model>-<job>`, the name submissions are made under.
    pub fn training_job_name(&self) -> String {
        format!("{}-{}", self.model, self.identifier)
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn job_type(&self) -> JobType {
        match self.kind {
            JobKind::Training => JobType::Training,
            JobKind::Tuning(_) => JobType::Tuning,
        }
    }

    pub fn kind(&self) -> &JobKind {
        &self.kind
    }

    /// Hyperparameters after merging the model's defaults with the job's own.
    pub fn hyperparameters(&self) -> &Parameters {
        &self.hyperparameters
    }

    /// The estimator block in effect for this job.
    pub fn estimator_spec(&self) -> &EstimatorSpec {
        &self.estimator_spec
    }

    pub fn estimator(&self) -> &dyn Estimator {
        self.estimator.as_ref()
    }

    /// Resolved ranges and controls, for tuning jobs.
    pub fn tuning(&self) -> Option<&TuningRequest> {
        match &self.kind {
            JobKind::Training => None,
            JobKind::Tuning(request) => Some(request),
        }
    }

    pub fn run(&self) -> LeiahResult<()> {
        info!("Running {} job \"{}\"", self.job_type(), self.qualified_name());
        match &self.kind {
            JobKind::Training => self.estimator.fit()?,
            JobKind::Tuning(request) => self.estimator.tune(request)?,
        }
        Ok(())
    }
}
