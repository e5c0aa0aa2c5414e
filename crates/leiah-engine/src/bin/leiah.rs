use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use leiah_engine::{register_framework, Descriptor, DryRunBackend, EstimatorRegistry, Selector};
use tracing_subscriber::EnvFilter;

/// Run the training and tuning jobs of a Leiah descriptor.
#[derive(Parser, Debug)]
#[command(name = "leiah", version, about)]
struct Args {
    /// Path of the YAML descriptor
    descriptor: PathBuf,

    /// Jobs to run: `<model>` or `<model>.<job>`. Runs every job when omitted.
    targets: Vec<String>,

    /// Print the jobs the targets resolve to instead of running them
    #[arg(long)]
    list: bool,

    /// Default log filter, overridden by RUST_LOG
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let backend = Arc::new(DryRunBackend);
    let mut registry = EstimatorRegistry::new();
    register_framework(&mut registry, "leiah.estimators.TensorFlow", "tensorflow", backend.clone());
    register_framework(&mut registry, "leiah.estimators.PyTorch", "pytorch", backend);

    let descriptor = Descriptor::create(args.descriptor, &registry)?;
    let selector = if args.targets.is_empty() {
        Selector::All
    } else {
        Selector::from(args.targets)
    };

    if args.list {
        for job in descriptor.resolve(selector)? {
            println!(
                "{}\t{}\t{}",
                job.qualified_name(),
                job.job_type(),
                job.description().unwrap_or_default()
            );
        }
        return Ok(());
    }

    let count = descriptor.process(selector)?;
    println!("Processed {count} jobs");
    Ok(())
}
