//! Softmax adapter: Reference implementation of `SeverityClassifier`.
//!
//! A multinomial logistic regression exported as JSON:
//!
//! ```json
//! { "classes": 5, "n_features": 13,
//!   "coefficients": [[...13 values...], ...5 rows...],
//!   "intercepts": [...5 values...] }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{NormalizedVector, FEATURE_COUNT, SEVERITY_LEVELS};
use crate::ports::{ClassProbabilities, ClassifierError, SeverityClassifier};

/// Model parameters as persisted on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxModel {
    pub classes: usize,
    pub n_features: usize,
    /// One row of weights per class
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
}

/// Softmax classifier over the scaled feature vector.
#[derive(Debug, Clone)]
pub struct SoftmaxClassifier {
    weights: Vec<[f64; FEATURE_COUNT]>,
    intercepts: Vec<f64>,
}

impl SoftmaxClassifier {
    /// Check the model's shape and wrap it.
    ///
    /// # Errors
    /// Returns `ClassifierError::InvalidModel` if the dimensions do not match
    /// five classes over thirteen features, or a parameter is not finite.
    pub fn new(model: SoftmaxModel) -> Result<Self, ClassifierError> {
        if model.classes != SEVERITY_LEVELS {
            return Err(ClassifierError::InvalidModel(format!(
                "expected {SEVERITY_LEVELS} classes, got {}",
                model.classes
            )));
        }
        if model.n_features != FEATURE_COUNT {
            return Err(ClassifierError::InvalidModel(format!(
                "expected {FEATURE_COUNT} features, got {}",
                model.n_features
            )));
        }
        if model.coefficients.len() != model.classes || model.intercepts.len() != model.classes {
            return Err(ClassifierError::InvalidModel(
                "coefficient rows and intercepts must match class count".into(),
            ));
        }

        let mut weights = Vec::with_capacity(model.classes);
        for (class, row) in model.coefficients.iter().enumerate() {
            let row: [f64; FEATURE_COUNT] = row.as_slice().try_into().map_err(|_| {
                ClassifierError::InvalidModel(format!(
                    "coefficient row {class} has {} values, expected {FEATURE_COUNT}",
                    row.len()
                ))
            })?;
            weights.push(row);
        }

        let finite = weights.iter().flatten().chain(&model.intercepts).all(|v| v.is_finite());
        if !finite {
            return Err(ClassifierError::InvalidModel(
                "model parameters must be finite".into(),
            ));
        }

        Ok(Self {
            weights,
            intercepts: model.intercepts,
        })
    }

    /// Load a model from a JSON file.
    ///
    /// # Errors
    /// Returns `ClassifierError::ModelNotFound` if the file does not exist,
    /// `ClassifierError::ModelLoad` if it cannot be read or parsed, or
    /// `ClassifierError::InvalidModel` for a bad shape.
    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        let content = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ClassifierError::ModelNotFound(path.to_path_buf()),
            _ => ClassifierError::ModelLoad(format!("Failed to read {}: {e}", path.display())),
        })?;
        let model: SoftmaxModel = serde_json::from_slice(&content).map_err(|e| {
            ClassifierError::ModelLoad(format!("Invalid model format in {}: {e}", path.display()))
        })?;
        let classifier = Self::new(model)?;
        tracing::info!("Loaded softmax classifier from {}", path.display());
        Ok(classifier)
    }

    fn logits(&self, features: &NormalizedVector) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.intercepts)
            .map(|(row, b)| row.iter().zip(features.iter()).map(|(w, x)| w * x).sum::<f64>() + b)
            .collect()
    }
}

impl SeverityClassifier for SoftmaxClassifier {
    fn classify(&self, features: &NormalizedVector) -> Result<usize, ClassifierError> {
        let logits = self.logits(features);
        if logits.iter().any(|z| !z.is_finite()) {
            return Err(ClassifierError::Inference("non-finite logit".into()));
        }

        // Lowest index wins ties.
        let mut best = 0;
        for (i, z) in logits.iter().enumerate().skip(1) {
            if *z > logits[best] {
                best = i;
            }
        }
        Ok(best)
    }

    fn as_probabilistic(&self) -> Option<&dyn ClassProbabilities> {
        Some(self)
    }
}

impl ClassProbabilities for SoftmaxClassifier {
    fn class_probabilities(&self, features: &NormalizedVector) -> Result<Vec<f64>, ClassifierError> {
        let logits = self.logits(features);
        let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !max.is_finite() {
            return Err(ClassifierError::Inference("non-finite logit".into()));
        }

        let exps: Vec<f64> = logits.iter().map(|z| (z - max).exp()).collect();
        let total: f64 = exps.iter().sum();
        Ok(exps.into_iter().map(|e| e / total).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_with_intercepts(intercepts: [f64; 5]) -> SoftmaxModel {
        SoftmaxModel {
            classes: 5,
            n_features: 13,
            coefficients: vec![vec![0.0; 13]; 5],
            intercepts: intercepts.to_vec(),
        }
    }

    #[test]
    fn test_argmax_and_probabilities_agree() {
        let mut model = model_with_intercepts([0.0; 5]);
        model.coefficients[3][0] = 2.0;
        let classifier = SoftmaxClassifier::new(model).expect("valid model");

        let mut values = [0.0; 13];
        values[0] = 1.5;
        let features = NormalizedVector::new(values);

        assert_eq!(classifier.classify(&features).expect("classify"), 3);
        let probs = classifier
            .class_probabilities(&features)
            .expect("probabilities");
        assert_eq!(probs.len(), 5);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        let argmax = probs
            .iter()
            .enumerate()
            .fold(0, |best, (i, p)| if *p > probs[best] { i } else { best });
        assert_eq!(argmax, 3);
    }

    #[test]
    fn test_ties_pick_lowest_index() {
        let classifier =
            SoftmaxClassifier::new(model_with_intercepts([0.0, 1.0, 1.0, 0.0, 1.0])).expect("valid");
        let features = NormalizedVector::new([0.0; 13]);
        assert_eq!(classifier.classify(&features).expect("classify"), 1);
    }

    #[test]
    fn test_large_logits_are_stable() {
        let classifier = SoftmaxClassifier::new(model_with_intercepts([1000.0, 999.0, 0.0, 0.0, 0.0]))
            .expect("valid");
        let probs = classifier
            .class_probabilities(&NormalizedVector::new([0.0; 13]))
            .expect("probabilities");
        assert!(probs.iter().all(|p| p.is_finite()));
        assert!(probs[0] > probs[1]);
    }

    #[test]
    fn test_shape_is_checked() {
        let mut model = model_with_intercepts([0.0; 5]);
        model.coefficients[2].pop();
        assert!(matches!(
            SoftmaxClassifier::new(model),
            Err(ClassifierError::InvalidModel(_))
        ));

        let mut four = model_with_intercepts([0.0; 5]);
        four.classes = 4;
        assert!(SoftmaxClassifier::new(four).is_err());

        let mut nan = model_with_intercepts([0.0; 5]);
        nan.intercepts[0] = f64::NAN;
        assert!(SoftmaxClassifier::new(nan).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = SoftmaxClassifier::load(Path::new("does/not/exist.json")).expect_err("missing");
        assert!(matches!(err, ClassifierError::ModelNotFound(_)));
    }

    #[test]
    fn test_load_distinguishes_corrupt_from_missing() {
        let temp = tempfile::tempdir().expect("tempdir");

        let wrong_shape = temp.path().join("four_classes.json");
        let mut model = model_with_intercepts([0.0; 5]);
        model.classes = 4;
        std::fs::write(&wrong_shape, serde_json::to_vec(&model).expect("serialize"))
            .expect("write model");
        assert!(matches!(
            SoftmaxClassifier::load(&wrong_shape),
            Err(ClassifierError::InvalidModel(_))
        ));

        let garbage = temp.path().join("garbage.json");
        std::fs::write(&garbage, b"{ not json").expect("write model");
        assert!(matches!(
            SoftmaxClassifier::load(&garbage),
            Err(ClassifierError::ModelLoad(_))
        ));
    }
}
