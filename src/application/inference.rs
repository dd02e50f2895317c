//! Prediction service: Orchestrates one severity assessment.
//!
//! This service coordinates:
//! - Form validation
//! - Encoding and scaling
//! - The classifier call
//! - Result interpretation

use std::sync::Arc;

use crate::domain::{Artifacts, Assessment, NormalizedVector, Prediction, RawInput};
use crate::ports::{ClassifierError, SeverityClassifier};
use crate::CardiogradeError;

use super::{interpret, normalize, validate};

/// Validate a record and turn it into model input.
///
/// # Errors
/// Returns `CardiogradeError::Validation` with every message if the record is
/// rejected; normalization is not attempted in that case.
pub fn prepare(raw: &RawInput, artifacts: &Artifacts) -> Result<NormalizedVector, CardiogradeError> {
    tracing::debug!("Step 1: Validating form input...");
    validate(raw, &artifacts.encodings).map_err(CardiogradeError::Validation)?;

    tracing::debug!("Step 2: Encoding and scaling features...");
    let features = normalize(
        raw,
        &artifacts.encodings,
        &artifacts.scaling,
        &artifacts.order,
    )?;
    Ok(features)
}

/// Run the classifier, collecting probabilities when it offers them.
///
/// # Errors
/// Propagates any `ClassifierError` from the model.
pub fn predict<C>(model: &C, features: &NormalizedVector) -> Result<Prediction, ClassifierError>
where
    C: SeverityClassifier + ?Sized,
{
    let class_index = model.classify(features)?;

    let probabilities = match model.as_probabilistic() {
        Some(p) => Some(p.class_probabilities(features)?),
        None => {
            tracing::debug!("Classifier exposes no class probabilities");
            None
        }
    };

    Ok(Prediction {
        class_index,
        probabilities,
    })
}

/// Service for running severity assessments.
///
/// Artifacts and classifier are shared read-only; a single service can be
/// cloned across request handlers.
pub struct PredictionService<C>
where
    C: SeverityClassifier,
{
    artifacts: Arc<Artifacts>,
    classifier: Arc<C>,
}

impl<C> Clone for PredictionService<C>
where
    C: SeverityClassifier,
{
    fn clone(&self) -> Self {
        Self {
            artifacts: Arc::clone(&self.artifacts),
            classifier: Arc::clone(&self.classifier),
        }
    }
}

impl<C> PredictionService<C>
where
    C: SeverityClassifier,
{
    /// Create a new prediction service.
    pub fn new(artifacts: Arc<Artifacts>, classifier: Arc<C>) -> Self {
        Self {
            artifacts,
            classifier,
        }
    }

    #[must_use]
    pub fn artifacts(&self) -> &Artifacts {
        &self.artifacts
    }

    /// Assess one form submission.
    ///
    /// Performs the full pipeline:
    /// 1. Validate the record
    /// 2. Encode and scale it
    /// 3. Classify
    /// 4. Interpret the class
    ///
    /// # Errors
    /// Returns `CardiogradeError::Validation` for rejected input (the
    /// classifier is never called), or the first pipeline/classifier error.
    pub fn assess(&self, raw: &RawInput) -> Result<Assessment, CardiogradeError> {
        tracing::info!("Starting severity assessment...");

        let features = prepare(raw, &self.artifacts)?;
        self.assess_features(&features)
    }

    /// Classify and interpret a vector already produced by [`prepare`].
    ///
    /// # Errors
    /// Returns the classifier's error or `PipelineError::UnknownClass`.
    pub fn assess_features(
        &self,
        features: &NormalizedVector,
    ) -> Result<Assessment, CardiogradeError> {
        tracing::debug!("Step 3: Running classifier...");
        let prediction = predict(self.classifier.as_ref(), features)?;

        tracing::debug!("Step 4: Interpreting class {}...", prediction.class_index);
        let result = interpret(prediction.class_index, prediction.probabilities)?;
        let assessment = Assessment::new(result);

        match assessment.result.confidence() {
            Some(c) => tracing::info!(
                "Assessment complete: severity={}, confidence={:.2}%",
                assessment.result.severity_level,
                c * 100.0
            ),
            None => tracing::info!(
                "Assessment complete: severity={}",
                assessment.result.severity_level
            ),
        }

        Ok(assessment)
    }
}
