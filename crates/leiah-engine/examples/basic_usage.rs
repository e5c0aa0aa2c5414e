use std::sync::Arc;

use leiah_engine::*;
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Leiah Basic Usage Example");

    let mut registry = EstimatorRegistry::new();
    register_framework(
        &mut registry,
        "leiah.estimators.TensorFlow",
        "tensorflow",
        Arc::new(DryRunBackend),
    );
    println!("Registered estimators: {:?}", registry.classnames());

    // A descriptor can also be loaded from a YAML file path
    let descriptor = Descriptor::create(
        json!({
            "models": {
                "image-classifier": {
                    "estimator": {
                        "classname": "leiah.estimators.TensorFlow",
                        "properties": {
                            "entry_point": "train.py",
                            "train_instance_type": "ml.m5.large",
                            "role": "arn:aws:iam::000000000000:role/training",
                        },
                    },
                    "hyperparameters": {"epochs": 10},
                    "training-jobs": {
                        "1": {"description": "baseline", "hyperparameters": {"batch_size": 32}},
                        "2": {"hyperparameters": {"epochs": 20, "batch_size": 64}},
                    },
                    "hyperparameter-tuning-jobs": {
                        "hpt-01": {
                            "hyperparameter_ranges": {
                                "learning_rate": {
                                    "type": "continuous",
                                    "min_value": 0.001,
                                    "max_value": 0.1,
                                },
                                "batch_size": {"type": "categorical", "values": [32, 64]},
                            },
                            "max_jobs": 10,
                            "max_parallel_jobs": 2,
                            "objective_type": "Maximize",
                        }
                    },
                }
            }
        }),
        &registry,
    )?;

    for job in descriptor.jobs() {
        println!(
            "{} ({}): {}",
            job.qualified_name(),
            job.job_type(),
            serde_json::to_string(job.hyperparameters())?
        );
    }

    let count = descriptor.process("image-classifier.1")?;
    println!("Submitted {} job", count);

    let count = descriptor.process(vec!["image-classifier.2", "image-classifier.hpt-01"])?;
    println!("Submitted {} jobs", count);

    Ok(())
}
