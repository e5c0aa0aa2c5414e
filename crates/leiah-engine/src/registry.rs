//! Estimator registry: resolves dotted identifiers to estimator factories.
//!
//! Estimators are registered up front under the dotted identifier descriptors
//! refer to them by (`package.module.ClassName`). Looking one up validates the
//! identifier shape the same way regardless of whether it is registered, so a
//! bare `ClassName` is always rejected.

use leiah_types::{EstimatorError, EstimatorResult};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use crate::estimator::{Estimator, EstimatorArgs};

/// Builds an estimator from the arguments a job assembles.
pub type EstimatorFactory =
    Box<dyn Fn(EstimatorArgs) -> EstimatorResult<Box<dyn Estimator>> + Send + Sync>;

/// Map from dotted identifier to estimator factory.
#[derive(Default)]
pub struct EstimatorRegistry {
    factories: HashMap<String, EstimatorFactory>,
}

impl fmt::Debug for EstimatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("EstimatorRegistry")
            .field("estimators", &names)
            .finish()
    }
}

impl EstimatorRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register `factory` under `classname`, replacing any earlier factory.
    pub fn register<F>(&mut self, classname: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(EstimatorArgs) -> EstimatorResult<Box<dyn Estimator>> + Send + Sync + 'static,
    {
        let classname = classname.into();
        debug!("Registering estimator \"{}\"", classname);
        self.factories.insert(classname, Box::new(factory));
        self
    }

    pub fn contains(&self, classname: &str) -> bool {
        self.factories.contains_key(classname.trim())
    }

    /// Registered identifiers, sorted.
    pub fn classnames(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolve `classname` to its factory.
    pub fn load(&self, classname: &str) -> EstimatorResult<&EstimatorFactory> {
        let classname = classname.trim();
        let invalid = |reason: &str| EstimatorError::Invalid {
            classname: classname.to_string(),
            reason: reason.to_string(),
        };

        match classname.rsplit_once('.') {
            Some((module, name)) if !module.is_empty() && !name.is_empty() => {}
            _ => return Err(invalid("expected a dotted path such as package.module.ClassName")),
        }

        self.factories
            .get(classname)
            .ok_or_else(|| invalid("no estimator is registered under this name"))
    }

    /// Resolve `args.classname` and construct the estimator.
    ///
    /// Anything the factory reports other than an invalid-estimator error is
    /// surfaced as a construction error naming the identifier.
    pub fn construct(&self, args: EstimatorArgs) -> EstimatorResult<Box<dyn Estimator>> {
        let classname = args.classname.trim().to_string();
        let factory = self.load(&classname)?;
        debug!(
            "Constructing estimator \"{}\" for {}.{}",
            classname, args.model, args.job
        );

        factory(args).map_err(|e| match e {
            EstimatorError::Invalid { .. } | EstimatorError::Construction { .. } => e,
            other => EstimatorError::Construction {
                classname,
                message: other.to_string(),
            },
        })
    }
}
