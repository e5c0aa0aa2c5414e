use thiserror::Error;

/// Main error type for Leiah
#[derive(Error, Debug)]
pub enum LeiahError {
    #[error("Descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),

    #[error("Estimator error: {0}")]
    Estimator(#[from] EstimatorError),

    #[error("Parameter range error: {0}")]
    ParameterRange(#[from] ParameterRangeError),

    /// Reading the descriptor file failed. Not-found errors arrive here
    /// untouched so callers can tell them apart from content errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LeiahError {
    /// True when the descriptor file itself does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Errors raised while loading a descriptor or resolving its jobs
#[derive(Error, Debug)]
pub enum DescriptorError {
    #[error("Invalid descriptor source: {message}")]
    InvalidSource { message: String },

    #[error("Invalid descriptor: {message}")]
    Invalid { message: String },

    #[error("Job \"{selector}\" was not found")]
    JobNotFound { selector: String },

    #[error("Job type \"{job_type}\" is not supported")]
    UnsupportedJobType { job_type: String },

    #[error("Job \"{model}.{job}\" has no estimator and model \"{model}\" declares no default")]
    MissingEstimator { model: String, job: String },
}

/// Errors raised while loading, constructing or running an estimator
#[derive(Error, Debug)]
pub enum EstimatorError {
    #[error("Error creating estimator \"{classname}\": {reason}")]
    Invalid { classname: String, reason: String },

    #[error("Error creating estimator \"{classname}\". {message}")]
    Construction { classname: String, message: String },

    #[error("Estimator does not support the {operation} operation")]
    Unsupported { operation: String },

    #[error("Submission of \"{job_name}\" failed: {message}")]
    Submission { job_name: String, message: String },
}

/// Errors raised while resolving hyperparameter ranges of a tuning job
#[derive(Error, Debug)]
pub enum ParameterRangeError {
    #[error("Parameter \"{parameter}\" doesn't have a \"type\" specified")]
    MissingType { parameter: String },

    #[error("The \"{attribute}\" attribute of {parameter_type} parameter \"{parameter}\" is required")]
    MissingAttribute {
        parameter: String,
        parameter_type: String,
        attribute: String,
    },

    #[error("Parameter type \"{parameter_type}\" of \"{parameter}\" is not supported")]
    UnsupportedType {
        parameter: String,
        parameter_type: String,
    },

    #[error("Invalid \"{attribute}\" for parameter \"{parameter}\": {message}")]
    InvalidAttribute {
        parameter: String,
        attribute: String,
        message: String,
    },
}

/// Result type alias for Leiah operations
pub type LeiahResult<T> = Result<T, LeiahError>;

/// Result type alias for estimator factories and operations
pub type EstimatorResult<T> = Result<T, EstimatorError>;

/// Macro for creating invalid-descriptor errors
#[macro_export]
macro_rules! descriptor_error {
    ($($arg:tt)*) => {
        $crate::errors::DescriptorError::Invalid {
            message: format!($($arg)*),
        }
    };
}
