//! # Cardiograde
//!
//! Heart-disease severity prediction pipeline.
//!
//! This crate provides:
//! - Validation of thirteen-field clinical intake forms
//! - Categorical encoding and standard scaling against persisted artifacts
//! - Severity classification through a pluggable model
//! - Human-readable interpretation of the predicted class
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (form fields, feature layout, artifacts, severity)
//! - `ports`: Trait definitions for the classifier
//! - `adapters`: Concrete implementations (artifact loading, softmax model, log sanitizing)
//! - `application`: The per-request pipeline
//! - `config`: Environment-driven settings

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use domain::{Assessment, PredictionResult, RawInput, SeverityLevel};

/// Result type for Cardiograde operations
pub type Result<T> = std::result::Result<T, CardiogradeError>;

/// Main error type for Cardiograde
#[derive(Debug, thiserror::Error)]
pub enum CardiogradeError {
    #[error("Invalid form input: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Artifact error: {0}")]
    Artifact(#[from] domain::ArtifactError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] domain::PipelineError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ports::ClassifierError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
