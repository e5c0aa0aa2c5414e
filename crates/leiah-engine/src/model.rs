//! Models: named groups of jobs sharing default hyperparameters and an
//! estimator.

use leiah_types::{descriptor_error, parameters_section, value_kind, LeiahResult, Parameters};
use serde_json::Value;
use tracing::debug;

use crate::estimator::EstimatorSpec;
use crate::job::{Job, JobType};
use crate::registry::EstimatorRegistry;

/// Sections that declare training jobs. `experiments` is the older spelling.
const TRAINING_SECTIONS: [&str; 2] = ["training-jobs", "experiments"];
const TUNING_SECTION: &str = "hyperparameter-tuning-jobs";

/// Model-level settings every job of the model inherits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelDefaults {
    pub name: String,
    pub hyperparameters: Parameters,
    pub estimator: Option<EstimatorSpec>,
}

/// A named model and the jobs it owns, in declaration order.
#[derive(Debug)]
pub struct Model {
    defaults: ModelDefaults,
    jobs: Vec<Job>,
}

impl Model {
    /// Build model `name` and all of its jobs from descriptor data.
    pub fn new(
        name: impl Into<String>,
        data: &Value,
        registry: &EstimatorRegistry,
    ) -> LeiahResult<Self> {
        let name = name.into();
        let owner = format!("model \"{name}\"");

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

        let defaults = ModelDefaults {
            hyperparameters: parameters_section(data, "hyperparameters", &owner)?,
            estimator: EstimatorSpec::from_section(data, &owner)?,
            name,
        };

        let mut model = Self {
            defaults,
            jobs: Vec::new(),
        };

        for section in TRAINING_SECTIONS {
            model.build_section(data, section, JobType::Training, registry)?;
        }
        model.build_section(data, TUNING_SECTION, JobType::Tuning, registry)?;

        debug!("Built model \"{}\" with {} jobs", model.name(), model.jobs.len());
        Ok(model)
    }

    fn build_section(
        &mut self,
        data: &Parameters,
        section: &str,
        default_type: JobType,
        registry: &EstimatorRegistry,
    ) -> LeiahResult<()> {
        let jobs = parameters_section(data, section, &format!("model \"{}\"", self.name()))?;

        for (identifier, job_data) in &jobs {
            let job = Job::new(
                &self.defaults,
                identifier.as_str(),
                job_data,
                default_type,
                registry,
            )?;
            self.insert(job);
        }
        Ok(())
    }

    /// Add `job`, replacing a job with the same identifier in place.
    fn insert(&mut self, job: Job) {
        match self
            .jobs
            .iter_mut()
            .find(|existing| existing.identifier() == job.identifier())
        {
            Some(existing) => *existing = job,
            None => self.jobs.push(job),
        }
    }

    pub fn name(&self) -> &str {
        &self.defaults.name
    }

    pub fn defaults(&self) -> &ModelDefaults {
        &self.defaults
    }

    pub fn hyperparameters(&self) -> &Parameters {
        &self.defaults.hyperparameters
    }

    pub fn estimator(&self) -> Option<&EstimatorSpec> {
        self.defaults.estimator.as_ref()
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn job(&self, identifier: &str) -> Option<&Job> {
        self.jobs.iter().find(|job| job.identifier() == identifier)
    }
}
