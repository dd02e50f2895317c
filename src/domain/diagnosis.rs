//! Severity prediction result types.
//!
//! Represents the output of the heart-disease severity classifier.

use serde::{Deserialize, Serialize};

/// Number of severity classes the classifier emits.
pub const SEVERITY_LEVELS: usize = 5;

/// Heart-disease severity, as predicted by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SeverityLevel {
    /// Less than 50% artery blockage
    None,
    Mild,
    Moderate,
    Severe,
    VerySevere,
}

impl SeverityLevel {
    pub const ALL: [Self; SEVERITY_LEVELS] = [
        Self::None,
        Self::Mild,
        Self::Moderate,
        Self::Severe,
        Self::VerySevere,
    ];

    /// Map a classifier output index to a level.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    #[must_use]
    pub fn index(&self) -> u8 {
        *self as u8
    }

    /// Get a human-readable description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::None => "No significant heart disease (less than 50% artery blockage)",
            Self::Mild => "Mild heart disease",
            Self::Moderate => "Moderate heart disease",
            Self::Severe => "Severe heart disease",
            Self::VerySevere => "Very severe heart disease",
        }
    }

    /// Get the advice shown alongside the description.
    #[must_use]
    pub fn recommendation(&self) -> &'static str {
        match self {
            Self::None => "Continue healthy lifestyle and regular checkups.",
            Self::Mild => "Consult with a cardiologist. Lifestyle changes recommended.",
            Self::Moderate => "Seek medical attention. Treatment may be required.",
            Self::Severe => "Seek immediate medical attention. Treatment likely required.",
            Self::VerySevere => "Seek emergency medical attention immediately.",
        }
    }
}

impl std::fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::Mild => write!(f, "MILD"),
            Self::Moderate => write!(f, "MODERATE"),
            Self::Severe => write!(f, "SEVERE"),
            Self::VerySevere => write!(f, "VERY SEVERE"),
        }
    }
}

/// Raw classifier output (before interpretation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Predicted class index
    pub class_index: usize,

    /// Per-class probabilities, if the classifier exposes them
    pub probabilities: Option<Vec<f64>>,
}

/// Interpreted prediction returned to the hosting layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Severity class, 0 to 4
    pub severity_level: u8,
    pub description: String,
    pub recommendation: String,
    /// Passed through from the classifier unchanged
    pub probabilities: Option<Vec<f64>>,
}

impl PredictionResult {
    /// Build a result for a known level.
    #[must_use]
    pub fn new(level: SeverityLevel, probabilities: Option<Vec<f64>>) -> Self {
        Self {
            severity_level: level.index(),
            description: level.description().to_string(),
            recommendation: level.recommendation().to_string(),
            probabilities,
        }
    }

    #[must_use]
    pub fn severity(&self) -> Option<SeverityLevel> {
        SeverityLevel::from_index(usize::from(self.severity_level))
    }

    /// Probability of the predicted class, when available.
    #[must_use]
    pub fn confidence(&self) -> Option<f64> {
        self.probabilities
            .as_ref()
            .and_then(|p| p.get(usize::from(self.severity_level)).copied())
    }
}

/// A prediction together with its request metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    /// Unique identifier
    pub id: String,

    pub result: PredictionResult,

    /// Timestamp of the assessment
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Assessment {
    #[must_use]
    pub fn new(result: PredictionResult) -> Self {
        Self {
            id: uuid_v4(),
            result,
            created_at: chrono::Utc::now(),
        }
    }
}

/// Generate a random UUID v4 using ChaCha20 seeded from OS entropy.
fn uuid_v4() -> String {
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    let mut rng = ChaCha20Rng::from_entropy();
    let bytes: [u8; 16] = rng.gen();

    format!(
        "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3],
        bytes[4], bytes[5],
        (bytes[6] & 0x0f) | 0x40, bytes[7],
        (bytes[8] & 0x3f) | 0x80, bytes[9],
        bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_levels_have_distinct_text() {
        let descriptions: HashSet<_> = SeverityLevel::ALL.iter().map(|l| l.description()).collect();
        let recommendations: HashSet<_> =
            SeverityLevel::ALL.iter().map(|l| l.recommendation()).collect();
        assert_eq!(descriptions.len(), SEVERITY_LEVELS);
        assert_eq!(recommendations.len(), SEVERITY_LEVELS);
        assert!(descriptions.iter().all(|d| !d.is_empty()));
    }

    #[test]
    fn test_from_index() {
        assert_eq!(SeverityLevel::from_index(0), Some(SeverityLevel::None));
        assert_eq!(SeverityLevel::from_index(4), Some(SeverityLevel::VerySevere));
        assert_eq!(SeverityLevel::from_index(5), None);
        assert_eq!(SeverityLevel::Severe.index(), 3);
    }

    #[test]
    fn test_result_confidence() {
        let result = PredictionResult::new(
            SeverityLevel::Mild,
            Some(vec![0.1, 0.6, 0.2, 0.05, 0.05]),
        );
        assert_eq!(result.severity(), Some(SeverityLevel::Mild));
        assert_eq!(result.confidence(), Some(0.6));
        assert_eq!(PredictionResult::new(SeverityLevel::Mild, None).confidence(), None);
    }

    #[test]
    fn test_assessment_ids_unique() {
        let result = PredictionResult::new(SeverityLevel::None, None);
        let a = Assessment::new(result.clone());
        let b = Assessment::new(result);
        assert_ne!(a.id, b.id);
        assert_eq!(a.id.len(), 36);
    }
}
