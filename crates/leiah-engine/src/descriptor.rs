//! The descriptor: entry point that loads the model tree and runs jobs by name.

use leiah_types::{descriptor_error, value_kind, DescriptorError, LeiahError, LeiahResult};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::job::Job;
use crate::model::Model;
use crate::registry::EstimatorRegistry;

/// Where a descriptor comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum DescriptorSource {
    /// An already parsed document. A string value is read as a file path.
    Value(Value),
    /// Path of a YAML descriptor file.
    Path(PathBuf),
}

impl From<Value> for DescriptorSource {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<PathBuf> for DescriptorSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for DescriptorSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<&str> for DescriptorSource {
    fn from(path: &str) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

impl From<String> for DescriptorSource {
    fn from(path: String) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

/// Which jobs to run.
///
/// Each target is `<model>` (every job of the model, in order) or
/// `<model>.<job>`. Only the first `.` separates the two, so job identifiers
/// may contain dots themselves (`model-02.1.0.1` names job `1.0.1`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selector {
    /// Every job of every model.
    #[default]
    All,
    Targets(Vec<String>),
}

impl From<&str> for Selector {
    fn from(target: &str) -> Self {
        Self::Targets(vec![target.to_string()])
    }
}

impl From<String> for Selector {
    fn from(target: String) -> Self {
        Self::Targets(vec![target])
    }
}

impl From<Vec<String>> for Selector {
    fn from(targets: Vec<String>) -> Self {
        Self::Targets(targets)
    }
}

impl From<Vec<&str>> for Selector {
    fn from(targets: Vec<&str>) -> Self {
        Self::Targets(targets.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Selector {
    fn from(targets: &[&str]) -> Self {
        Self::Targets(targets.iter().map(|t| t.to_string()).collect())
    }
}

impl<T: Into<Selector>> From<Option<T>> for Selector {
    fn from(selector: Option<T>) -> Self {
        selector.map(Into::into).unwrap_or_default()
    }
}

/// The resolved model tree of a descriptor, in declaration order.
#[derive(Debug)]
pub struct Descriptor {
    models: Vec<Model>,
}

impl Descriptor {
    /// Load a descriptor from `source`, constructing estimators through
    /// `registry`.
    pub fn create(
        source: impl Into<DescriptorSource>,
        registry: &EstimatorRegistry,
    ) -> LeiahResult<Self> {
        match source.into() {
            DescriptorSource::Path(path) => Self::from_path(path, registry),
            DescriptorSource::Value(Value::String(path)) => Self::from_path(path, registry),
            DescriptorSource::Value(document @ Value::Object(_)) => {
                Self::from_value(&document, registry)
            }
            DescriptorSource::Value(other) => Err(DescriptorError::InvalidSource {
                message: format!(
                    "must be a mapping, or the path of the descriptor file, found {}",
                    value_kind(&other)
                ),
            }
            .into()),
        }
    }

    /// Load a YAML descriptor file.
    ///
    /// Failing to read the file is reported as the underlying I/O error, so
    /// a missing file stays distinguishable. Content that is not UTF-8 text
    /// is an invalid descriptor.
    pub fn from_path(path: impl AsRef<Path>, registry: &EstimatorRegistry) -> LeiahResult<Self> {
        let path = path.as_ref();
        info!("Loading descriptor {}", path.display());
        let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::InvalidData => {
                LeiahError::from(descriptor_error!("{}: {}", path.display(), e))
            }
            _ => LeiahError::Io(e),
        })?;
        Self::from_yaml_str(&contents, registry)
    }

    /// Parse a YAML descriptor document.
    ///
    /// Scalar keys (e.g. `1:`) are read as strings, and a key repeated within
    /// one mapping keeps its first position with the last value.
    pub fn from_yaml_str(contents: &str, registry: &EstimatorRegistry) -> LeiahResult<Self> {
        let document: Value =
            serde_yaml::from_str(contents).map_err(|e| descriptor_error!("{}", e))?;
        Self::from_value(&document, registry)
    }

    /// Build the model tree from a parsed document.
    pub fn from_value(document: &Value, registry: &EstimatorRegistry) -> LeiahResult<Self> {
        let root = match document {
            Value::Object(root) => root,
            other => {
                return Err(descriptor_error!(
                    "the document must be a mapping, found {}",
                    value_kind(other)
                )
                .into())
            }
        };

        let models = match root.get("models") {
            None => return Err(descriptor_error!("missing the root element \"models\"").into()),
            Some(Value::Null) => Vec::new(),
            Some(Value::Object(models)) => models
                .iter()
                .map(|(name, data)| Model::new(name.as_str(), data, registry))
                .collect::<LeiahResult<Vec<_>>>()?,
            Some(other) => {
                return Err(descriptor_error!(
                    "\"models\" must be a mapping, found {}",
                    value_kind(other)
                )
                .into())
            }
        };

        info!("Loaded descriptor with {} models", models.len());
        Ok(Self { models })
    }

    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn model(&self, name: &str) -> Option<&Model> {
        self.models.iter().find(|model| model.name() == name)
    }

    /// Every job of every model, in declaration order.
    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.models.iter().flat_map(|model| model.jobs())
    }

    /// The jobs `selector` targets, in the order they would run.
    pub fn resolve(&self, selector: impl Into<Selector>) -> LeiahResult<Vec<&Job>> {
        let targets = match selector.into() {
            Selector::All => return Ok(self.jobs().collect()),
            Selector::Targets(targets) => targets,
        };

        let mut jobs = Vec::new();
        for target in &targets {
            self.resolve_target(target, &mut jobs)?;
        }
        Ok(jobs)
    }

    fn resolve_target<'a>(
        &'a self,
        target: &str,
        jobs: &mut Vec<&'a Job>,
    ) -> Result<(), DescriptorError> {
        let not_found = || DescriptorError::JobNotFound {
            selector: target.to_string(),
        };

        let (model_name, identifier) = match target.split_once('.') {
            Some((model_name, identifier)) => (model_name, Some(identifier)),
            None => (target, None),
        };
        let model = self.model(model_name).ok_or_else(not_found)?;

        match identifier {
            None => jobs.extend(model.jobs()),
            Some(identifier) => jobs.push(model.job(identifier).ok_or_else(not_found)?),
        }
        Ok(())
    }

    /// Run the jobs `selector` targets, one after the other.
    ///
    /// Stops at the first job that fails. Returns how many jobs ran.
    pub fn process(&self, selector: impl Into<Selector>) -> LeiahResult<usize> {
        let jobs = self.resolve(selector)?;
        info!("Processing {} jobs", jobs.len());
        for job in &jobs {
            job.run()?;
        }
        Ok(jobs.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::Estimator;
    use leiah_types::{EstimatorError, EstimatorResult, LeiahError, Parameters};
    use leiah_tuning::TuningRequest;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Recording {
        name: String,
        fail: bool,
        runs: Arc<Mutex<Vec<String>>>,
    }

    impl Estimator for Recording {
        fn fit(&self) -> EstimatorResult<()> {
            self.runs.lock().push(self.name.clone());
            if self.fail {
                return Err(EstimatorError::Submission {
                    job_name: self.name.clone(),
                    message: "quota exceeded".to_string(),
                });
            }
            Ok(())
        }

        fn tune(&self, _request: &TuningRequest) -> EstimatorResult<()> {
            self.fit()
        }
    }

    fn registry(runs: &Arc<Mutex<Vec<String>>>) -> EstimatorRegistry {
        let mut registry = EstimatorRegistry::new();
        let runs = runs.clone();
        registry.register("tests.estimators.Recording", move |args| {
            Ok(Box::new(Recording {
                name: args.training_job_name(),
                fail: args.properties.get("fail").and_then(Value::as_bool).unwrap_or(false),
                runs: runs.clone(),
            }))
        });
        registry
    }

    fn document() -> Value {
        json!({
            "models": {
                "model-01": {
                    "estimator": {"classname": "tests.estimators.Recording"},
                    "training-jobs": {"1": {}, "2": {}},
                    "hyperparameter-tuning-jobs": {"hpt-01": {}},
                },
                "model-02": {
                    "estimator": {"classname": "tests.estimators.Recording"},
                    "training-jobs": {"1.0.1": {}},
                },
                "model-03": {},
            }
        })
    }

    fn descriptor(runs: &Arc<Mutex<Vec<String>>>) -> Descriptor {
        Descriptor::create(document(), &registry(runs)).unwrap()
    }

    fn identifiers(jobs: &[&Job]) -> Vec<String> {
        jobs.iter().map(|j| j.identifier().to_string()).collect()
    }

    #[test]
    fn models_keep_declaration_order() {
        let runs = Arc::default();
        let descriptor = descriptor(&runs);
        let names: Vec<&str> = descriptor.models().iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["model-01", "model-02", "model-03"]);
        assert_eq!(descriptor.model("model-01").unwrap().jobs().len(), 3);
        assert_eq!(descriptor.model("model-02").unwrap().jobs().len(), 1);
    }

    #[test]
    fn selects_single_job() {
        let runs = Arc::default();
        let descriptor = descriptor(&runs);
        assert_eq!(identifiers(&descriptor.resolve("model-01.2").unwrap()), vec!["2"]);
    }

    #[test]
    fn job_identifier_may_contain_dots() {
        let runs = Arc::default();
        let descriptor = descriptor(&runs);
        assert_eq!(
            identifiers(&descriptor.resolve("model-02.1.0.1").unwrap()),
            vec!["1.0.1"]
        );
    }

    #[test]
    fn selects_every_job_of_a_model_and_lists() {
        let runs = Arc::default();
        let descriptor = descriptor(&runs);

        let jobs = descriptor.resolve(vec!["model-01", "model-02.1.0.1"]).unwrap();
        assert_eq!(identifiers(&jobs), vec!["1", "2", "hpt-01", "1.0.1"]);

        let jobs = descriptor.resolve(vec!["model-01.1", "model-02.1.0.1"]).unwrap();
        assert_eq!(identifiers(&jobs), vec!["1", "1.0.1"]);
    }

    #[test]
    fn selects_everything_by_default() {
        let runs = Arc::default();
        let descriptor = descriptor(&runs);
        assert_eq!(descriptor.resolve(Selector::All).unwrap().len(), 4);
        assert_eq!(descriptor.resolve(None::<&str>).unwrap().len(), 4);
    }

    #[test]
    fn unknown_targets_name_the_selector() {
        let runs = Arc::default();
        let descriptor = descriptor(&runs);

        for target in ["unexistent.1", "model-01.unexistent", "unexistent", "model-01."] {
            match descriptor.resolve(target) {
                Err(LeiahError::Descriptor(DescriptorError::JobNotFound { selector })) => {
                    assert_eq!(selector, target)
                }
                other => panic!("unexpected result for {target}: {other:?}"),
            }
        }
    }

    #[test]
    fn process_runs_in_resolution_order() {
        let runs = Arc::default();
        let descriptor = descriptor(&runs);

        let count = descriptor
            .process(vec!["model-02", "model-01.hpt-01", "model-01.1"])
            .unwrap();
        assert_eq!(count, 3);
        assert_eq!(
            *runs.lock(),
            vec!["model-02-1.0.1", "model-01-hpt-01", "model-01-1"]
        );
    }

    #[test]
    fn process_stops_at_first_failure() {
        let runs = Arc::default();
        let document = json!({
            "models": {
                "m": {
                    "estimator": {"classname": "tests.estimators.Recording"},
                    "training-jobs": {
                        "a": {},
                        "b": {
                            "estimator": {
                                "classname": "tests.estimators.Recording",
                                "properties": {"fail": true},
                            }
                        },
                        "c": {},
                    },
                }
            }
        });
        let descriptor = Descriptor::create(document, &registry(&runs)).unwrap();

        let result = descriptor.process(Selector::All);
        assert!(matches!(
            result,
            Err(LeiahError::Estimator(EstimatorError::Submission { .. }))
        ));
        assert_eq!(*runs.lock(), vec!["m-a", "m-b"]);
    }

    #[test]
    fn missing_or_empty_models() {
        let runs = Arc::default();
        let registry = registry(&runs);

        let descriptor = Descriptor::create(json!({"models": null}), &registry).unwrap();
        assert!(descriptor.models().is_empty());

        let descriptor = Descriptor::create(json!({"models": {}}), &registry).unwrap();
        assert!(descriptor.models().is_empty());

        let result = Descriptor::create(json!({"other": {}}), &registry);
        assert!(matches!(
            result,
            Err(LeiahError::Descriptor(DescriptorError::Invalid { .. }))
        ));
    }

    #[test]
    fn invalid_source() {
        let runs = Arc::default();
        let result = Descriptor::create(json!(123), &registry(&runs));
        assert!(matches!(
            result,
            Err(LeiahError::Descriptor(DescriptorError::InvalidSource { .. }))
        ));
    }

    #[test]
    fn yaml_numeric_names_become_strings() {
        let runs = Arc::default();
        let yaml = r#"
models:
  1:
    estimator:
      classname: tests.estimators.Recording
    training-jobs:
      2: {}
      1.0.1: {}
"#;
        let descriptor = Descriptor::from_yaml_str(yaml, &registry(&runs)).unwrap();
        let model = descriptor.model("1").unwrap();
        let ids: Vec<&str> = model.jobs().iter().map(|j| j.identifier()).collect();
        assert_eq!(ids, vec!["2", "1.0.1"]);
        assert_eq!(identifiers(&descriptor.resolve("1.1.0.1").unwrap()), vec!["1.0.1"]);
    }

    #[test]
    fn malformed_yaml_is_an_invalid_descriptor() {
        let runs = Arc::default();
        let result = Descriptor::from_yaml_str("models: [unclosed", &registry(&runs));
        assert!(matches!(
            result,
            Err(LeiahError::Descriptor(DescriptorError::Invalid { .. }))
        ));

        let result = Descriptor::from_yaml_str("just a string", &registry(&runs));
        assert!(matches!(
            result,
            Err(LeiahError::Descriptor(DescriptorError::Invalid { .. }))
        ));
    }

    const DESCRIPTOR_YAML: &str = r#"
models:
  model-01:
    estimator:
      classname: tests.estimators.Recording
      properties:
        role: trainer
    hyperparameters:
      epochs: 10
    training-jobs:
      1:
        description: baseline
        hyperparameters:
          batch_size: 32
    hyperparameter-tuning-jobs:
      hpt-01:
        hyperparameter_ranges:
          learning_rate:
            type: continuous
            min_value: 0.001
            max_value: 0.1
        max_jobs: 4
"#;

    fn write_descriptor(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        std::io::Write::write_all(&mut file, contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn file_and_mapping_build_the_same_tree() {
        let runs = Arc::default();
        let registry = registry(&runs);
        let file = write_descriptor(DESCRIPTOR_YAML);

        let from_file = Descriptor::create(file.path(), &registry).unwrap();
        let from_path_string =
            Descriptor::create(json!(file.path().to_str().unwrap()), &registry).unwrap();
        let from_mapping = Descriptor::create(
            json!({
                "models": {
                    "model-01": {
                        "estimator": {
                            "classname": "tests.estimators.Recording",
                            "properties": {"role": "trainer"},
                        },
                        "hyperparameters": {"epochs": 10},
                        "training-jobs": {
                            "1": {"description": "baseline", "hyperparameters": {"batch_size": 32}},
                        },
                        "hyperparameter-tuning-jobs": {
                            "hpt-01": {
                                "hyperparameter_ranges": {
                                    "learning_rate": {
                                        "type": "continuous",
                                        "min_value": 0.001,
                                        "max_value": 0.1,
                                    }
                                },
                                "max_jobs": 4,
                            }
                        },
                    }
                }
            }),
            &registry,
        )
        .unwrap();

        for other in [&from_path_string, &from_mapping] {
            let left: Vec<&Job> = from_file.jobs().collect();
            let right: Vec<&Job> = other.jobs().collect();
            assert_eq!(left.len(), right.len());
            for (a, b) in left.iter().zip(&right) {
                assert_eq!(a.qualified_name(), b.qualified_name());
                assert_eq!(a.description(), b.description());
                assert_eq!(a.hyperparameters(), b.hyperparameters());
                assert_eq!(a.estimator_spec(), b.estimator_spec());
                assert_eq!(a.tuning(), b.tuning());
            }
        }

        let job = from_file.model("model-01").unwrap().job("1").unwrap();
        assert_eq!(job.description(), Some("baseline"));
        assert_eq!(
            Value::Object(job.hyperparameters().clone()),
            json!({"epochs": 10, "batch_size": 32})
        );
        let tuning = from_file.model("model-01").unwrap().job("hpt-01").unwrap().tuning().unwrap();
        assert_eq!(tuning.max_jobs, 4);
        assert_eq!(tuning.max_parallel_jobs, 1);
    }

    #[test]
    fn missing_file_keeps_the_io_error() {
        let runs = Arc::default();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unexistent.yaml");

        let err = Descriptor::create(path.as_path(), &registry(&runs)).unwrap_err();
        assert!(err.is_not_found(), "unexpected error: {err:?}");
    }

    #[test]
    fn malformed_file_is_an_invalid_descriptor() {
        let runs = Arc::default();
        let file = write_descriptor("models:\n  m: [unclosed\n");

        let result = Descriptor::create(file.path(), &registry(&runs));
        assert!(matches!(
            result,
            Err(LeiahError::Descriptor(DescriptorError::Invalid { .. }))
        ));
    }

    #[derive(Debug)]
    struct Capture {
        hyperparameters: Parameters,
        fits: Arc<Mutex<Vec<Parameters>>>,
    }

    impl Estimator for Capture {
        fn fit(&self) -> EstimatorResult<()> {
            self.fits.lock().push(self.hyperparameters.clone());
            Ok(())
        }
    }

    #[test]
    fn process_fits_once_with_merged_hyperparameters() {
        let fits: Arc<Mutex<Vec<Parameters>>> = Arc::default();
        let mut registry = EstimatorRegistry::new();
        let captured = fits.clone();
        registry.register("tests.estimators.Capture", move |args| {
            Ok(Box::new(Capture {
                hyperparameters: args.hyperparameters,
                fits: captured.clone(),
            }))
        });

        let descriptor = Descriptor::create(
            json!({
                "models": {
                    "m": {
                        "estimator": {"classname": "tests.estimators.Capture"},
                        "hyperparameters": {"epochs": 10},
                        "training-jobs": {"j1": {"hyperparameters": {"batch_size": 32}}},
                    }
                }
            }),
            &registry,
        )
        .unwrap();

        assert_eq!(descriptor.process("m.j1").unwrap(), 1);

        let fits = fits.lock();
        assert_eq!(fits.len(), 1);
        assert_eq!(Value::Object(fits[0].clone()), json!({"epochs": 10, "batch_size": 32}));
    }

    #[test]
    fn repeated_yaml_keys_keep_the_last_entry() {
        let runs = Arc::default();
        let yaml = r#"
models:
  m:
    estimator:
      classname: tests.estimators.Recording
    training-jobs:
      a: {}
  other: {}
  m:
    estimator:
      classname: tests.estimators.Recording
    training-jobs:
      b: {description: first}
      b: {description: second}
"#;
        let descriptor = Descriptor::from_yaml_str(yaml, &registry(&runs)).unwrap();

        let names: Vec<&str> = descriptor.models().iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["m", "other"]);

        let model = descriptor.model("m").unwrap();
        let ids: Vec<&str> = model.jobs().iter().map(|j| j.identifier()).collect();
        assert_eq!(ids, vec!["b"]);
        assert_eq!(model.job("b").unwrap().description(), Some("second"));
    }

    #[test]
    fn non_utf8_file_is_an_invalid_descriptor() {
        let runs = Arc::default();
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        std::io::Write::write_all(&mut file, &[b'm', 0xff, 0xfe, b':']).unwrap();

        let result = Descriptor::create(file.path(), &registry(&runs));
        match result {
            Err(LeiahError::Descriptor(DescriptorError::Invalid { .. })) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
