//! Result interpretation: class index to human-readable severity.

use crate::domain::{PipelineError, PredictionResult, SeverityLevel};

/// Map a predicted class to its description and recommendation.
///
/// Probabilities are passed through unchanged.
///
/// # Errors
/// Returns `PipelineError::UnknownClass` for any index outside `0..=4`.
pub fn interpret(
    class_index: usize,
    probabilities: Option<Vec<f64>>,
) -> Result<PredictionResult, PipelineError> {
    let level =
        SeverityLevel::from_index(class_index).ok_or(PipelineError::UnknownClass(class_index))?;
    Ok(PredictionResult::new(level, probabilities))
}
