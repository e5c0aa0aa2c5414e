//! Tuning-job controls and the request handed to an estimator's `tune`.

use leiah_types::{descriptor_error, display_value, DescriptorError, Parameters};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::ranges::ParameterRanges;

/// Whether the tuning backend should maximize or minimize the objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ObjectiveType {
    Maximize,
    #[default]
    Minimize,
}

impl FromStr for ObjectiveType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Maximize" => Ok(Self::Maximize),
            "Minimize" => Ok(Self::Minimize),
            other => Err(format!(
                "unknown objective type \"{other}\", expected Minimize or Maximize"
            )),
        }
    }
}

impl fmt::Display for ObjectiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Maximize => f.write_str("Maximize"),
            Self::Minimize => f.write_str("Minimize"),
        }
    }
}

/// Controls of a hyperparameter-tuning job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuningConfig {
    /// Maximum number of training jobs the tuner may launch.
    pub max_jobs: u32,

    /// How many of those jobs may run at the same time.
    pub max_parallel_jobs: u32,

    /// Direction of optimization.
    pub objective_type: ObjectiveType,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            max_jobs: 1,
            max_parallel_jobs: 1,
            objective_type: ObjectiveType::Minimize,
        }
    }
}

impl TuningConfig {
    /// Read the controls declared on a tuning job, falling back to the
    /// defaults for anything left out.
    pub fn from_job_data(data: &Parameters, owner: &str) -> Result<Self, DescriptorError> {
        let objective_type = match data.get("objective_type") {
            None | Some(Value::Null) => ObjectiveType::default(),
            Some(value) => display_value(value)
                .parse()
                .map_err(|message: String| descriptor_error!("{} of {}", message, owner))?,
        };

        Ok(Self {
            max_jobs: job_count(data, "max_jobs", owner)?,
            max_parallel_jobs: job_count(data, "max_parallel_jobs", owner)?,
            objective_type,
        })
    }

    pub fn with_max_jobs(mut self, n: u32) -> Self {
        self.max_jobs = n;
        self
    }

    pub fn with_max_parallel_jobs(mut self, n: u32) -> Self {
        self.max_parallel_jobs = n;
        self
    }

    pub fn with_objective_type(mut self, objective_type: ObjectiveType) -> Self {
        self.objective_type = objective_type;
        self
    }
}

fn job_count(data: &Parameters, key: &str, owner: &str) -> Result<u32, DescriptorError> {
    match data.get(key) {
        None | Some(Value::Null) => Ok(1),
        Some(value) => value
            .as_u64()
            .filter(|n| *n >= 1)
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| {
                descriptor_error!(
                    "\"{}\" of {} must be a positive integer, found {}",
                    key,
                    owner,
                    display_value(value)
                )
            }),
    }
}

/// Everything an estimator receives when asked to tune.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningRequest {
    pub hyperparameter_ranges: ParameterRanges,
    pub max_jobs: u32,
    pub max_parallel_jobs: u32,
    pub objective_type: ObjectiveType,
}

impl TuningRequest {
    pub fn new(hyperparameter_ranges: ParameterRanges, config: TuningConfig) -> Self {
        Self {
            hyperparameter_ranges,
            max_jobs: config.max_jobs,
            max_parallel_jobs: config.max_parallel_jobs,
            objective_type: config.objective_type,
        }
    }

    pub fn config(&self) -> TuningConfig {
        TuningConfig {
            max_jobs: self.max_jobs,
            max_parallel_jobs: self.max_parallel_jobs,
            objective_type: self.objective_type,
        }
    }

    /// True when every range is discrete and `max_jobs` asks for more jobs
    /// than there are distinct combinations.
    pub fn exceeds_search_space(&self) -> bool {
        match self.hyperparameter_ranges.grid_size() {
            Some(size) => self.max_jobs as usize > size,
            None => false,
        }
    }
}
