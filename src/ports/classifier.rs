//! Classifier port: Trait for the externally trained severity model.
//!
//! The model itself is trained and persisted elsewhere; the pipeline only
//! needs a class index and, when the model offers them, class probabilities.

use std::path::PathBuf;

use crate::domain::NormalizedVector;

/// Errors raised by classifier implementations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClassifierError {
    #[error("Model file not found: {}", .0.display())]
    ModelNotFound(PathBuf),

    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Inference failed: {0}")]
    Inference(String),
}

/// Trait for severity classifiers.
///
/// Implementations must emit class indices in `0..SEVERITY_LEVELS`.
pub trait SeverityClassifier: Send + Sync {
    /// Predict the severity class for a scaled feature vector.
    ///
    /// # Errors
    /// Returns `ClassifierError::Inference` if the model cannot score the input.
    fn classify(&self, features: &NormalizedVector) -> Result<usize, ClassifierError>;

    /// Probe for the optional probability capability.
    ///
    /// Defaults to `None`; probabilistic models return `Some(self)`.
    fn as_probabilistic(&self) -> Option<&dyn ClassProbabilities> {
        None
    }
}

/// Optional capability: per-class probability distribution.
pub trait ClassProbabilities: Send + Sync {
    /// Probabilities indexed by class, summing to 1.
    ///
    /// # Errors
    /// Returns `ClassifierError::Inference` if the model cannot score the input.
    fn class_probabilities(&self, features: &NormalizedVector)
        -> Result<Vec<f64>, ClassifierError>;
}

