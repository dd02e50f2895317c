//! Cardiograde: Heart-disease severity prediction demo.
//!
//! ```bash
//! cardiograde [input.json] [--form-options]
//! ```
//!
//! Without an input file the built-in example record is assessed.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cardiograde::adapters::sanitize::SanitizingMakeWriter;
use cardiograde::adapters::{load_artifacts, SoftmaxClassifier};
use cardiograde::application::{prepare, PredictionService};
use cardiograde::config::{Config, LogMode};
use cardiograde::domain::{form_options, ClinicalRecord, RawInput};
use cardiograde::ports::ClassifierError;
use cardiograde::CardiogradeError;

const USAGE: &str = "Usage: cardiograde [input.json] [--form-options]";

struct Args {
    input: Option<PathBuf>,
    form_options: bool,
}

fn parse_args() -> Result<Args> {
    let mut input = None;
    let mut form_options = false;

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--form-options" => form_options = true,
            "-h" | "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            _ if arg.starts_with('-') => bail!("Unknown arg: {arg}\n{USAGE}"),
            _ if input.is_none() => input = Some(PathBuf::from(arg)),
            _ => bail!("{USAGE}"),
        }
    }

    Ok(Args {
        input,
        form_options,
    })
}

fn init_logging(config: &Config) -> Result<WorkerGuard> {
    // stdout carries the demo's output; logs go to stderr or a file.
    let (writer, guard) = match config.log_mode {
        LogMode::File => {
            if let Some(parent) = config.log_file.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&config.log_file)
                .with_context(|| format!("opening log file {}", config.log_file.display()))?;
            tracing_appender::non_blocking(file)
        }
        LogMode::Stderr => tracing_appender::non_blocking(std::io::stderr()),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(SanitizingMakeWriter::new(writer)),
        )
        .init();

    Ok(guard)
}

fn read_input(path: Option<&PathBuf>) -> Result<RawInput> {
    match path {
        Some(path) => {
            let bytes =
                std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))
        }
        None => Ok(ClinicalRecord::example().to_raw()),
    }
}

fn main() -> Result<()> {
    let args = parse_args()?;

    if args.form_options {
        println!("{}", serde_json::to_string_pretty(&form_options())?);
        return Ok(());
    }

    let config = Config::from_env();
    let _guard = init_logging(&config)?;

    tracing::info!("Starting Cardiograde...");

    let raw = read_input(args.input.as_ref())?;
    println!("Input record:");
    for (key, value) in raw.iter() {
        println!("  {key:<10} {value}");
    }

    let artifacts = load_artifacts(&config.artifact_dir, &config.artifact_policy()?)
        .with_context(|| format!("loading artifacts from {}", config.artifact_dir.display()))?;
    let artifacts = Arc::new(artifacts);

    let features = match prepare(&raw, &artifacts) {
        Ok(features) => features,
        Err(CardiogradeError::Validation(errors)) => {
            println!("\nValidation errors:");
            for error in &errors {
                println!("  - {error}");
            }
            bail!("input rejected with {} validation error(s)", errors.len());
        }
        Err(e) => return Err(e.into()),
    };

    println!("\nScaled features (first 3):");
    for (feature, value) in artifacts.order.iter().zip(features.iter()).take(3) {
        println!("  {:<10} {value:>8.4}", feature.name());
    }

    let classifier = match SoftmaxClassifier::load(&config.model_path) {
        Ok(classifier) => classifier,
        Err(e @ ClassifierError::ModelNotFound(_)) => {
            tracing::warn!("No classifier available: {e}");
            println!(
                "\nNo trained model at {}; supply one to get a prediction.",
                config.model_path.display()
            );
            return Ok(());
        }
        Err(e) => {
            return Err(e)
                .with_context(|| format!("loading model {}", config.model_path.display()))
        }
    };

    let service = PredictionService::new(artifacts, Arc::new(classifier));
    let assessment = service.assess_features(&features)?;
    let result = &assessment.result;

    println!("\nPrediction:");
    match result.severity() {
        Some(level) => println!("  Severity:       {} ({level})", result.severity_level),
        None => println!("  Severity:       {}", result.severity_level),
    }
    println!("  Description:    {}", result.description);
    println!("  Recommendation: {}", result.recommendation);
    if let Some(probabilities) = &result.probabilities {
        println!("  Probabilities:");
        for (class, p) in probabilities.iter().enumerate() {
            println!("    {class}: {:>6.2}%", p * 100.0);
        }
    }

    tracing::info!("Cardiograde finished.");
    Ok(())
}
