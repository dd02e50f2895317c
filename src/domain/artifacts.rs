//! Preprocessing artifacts fitted offline: encoding tables, scaler, feature order.
//!
//! All three are immutable once constructed. Construction checks that they
//! agree with each other and with the form fields the pipeline knows about, so
//! the per-request path never has to.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::features::{CategoricalField, Feature, FEATURE_COUNT};

/// Errors raised while loading or checking preprocessing artifacts.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Missing artifact: {0}")]
    MissingArtifact(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Inconsistent artifacts: {0}")]
    Inconsistent(String),

    #[error("Artifact integrity check failed: {0}")]
    Integrity(String),
}

/// Codes for a single categorical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldEncoding {
    codes: BTreeMap<String, u32>,
}

impl FieldEncoding {
    #[must_use]
    pub fn code(&self, value: &str) -> Option<u32> {
        self.codes.get(value).copied()
    }

    /// Reverse lookup. Codes are unique within a field.
    #[must_use]
    pub fn label(&self, code: u32) -> Option<&str> {
        self.codes
            .iter()
            .find(|(_, c)| **c == code)
            .map(|(label, _)| label.as_str())
    }

    #[must_use]
    pub fn contains(&self, value: &str) -> bool {
        self.codes.contains_key(value)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.codes.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Categorical value to integer code, per field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingTable {
    tables: [FieldEncoding; 7],
}

impl EncodingTable {
    /// Build from the `encodings.json` layout.
    ///
    /// Every legal form option of every categorical field must have a code and
    /// codes must be unique within a field. Unknown top-level keys are ignored.
    ///
    /// # Errors
    /// Returns `ArtifactError::Inconsistent` describing the first gap found.
    pub fn from_map(mut map: BTreeMap<String, BTreeMap<String, u32>>) -> Result<Self, ArtifactError> {
        let mut tables: Vec<FieldEncoding> = Vec::with_capacity(CategoricalField::ALL.len());

        for cat in CategoricalField::ALL {
            let codes = map.remove(cat.key()).ok_or_else(|| {
                ArtifactError::Inconsistent(format!("encodings has no table for `{}`", cat.key()))
            })?;

            for option in cat.options() {
                if !codes.contains_key(option) {
                    return Err(ArtifactError::Inconsistent(format!(
                        "encodings for `{}` has no code for `{option}`",
                        cat.key()
                    )));
                }
            }

            let distinct: BTreeSet<u32> = codes.values().copied().collect();
            if distinct.len() != codes.len() {
                return Err(ArtifactError::Inconsistent(format!(
                    "encodings for `{}` reuse a code",
                    cat.key()
                )));
            }

            tables.push(FieldEncoding { codes });
        }

        for extra in map.keys() {
            tracing::warn!("Ignoring encoding table for unknown field `{extra}`");
        }

        let tables: [FieldEncoding; 7] = tables
            .try_into()
            .map_err(|_| ArtifactError::Inconsistent("encoding table count".into()))?;
        Ok(Self { tables })
    }

    /// Alphabetical label encoding of every form option.
    ///
    /// This is what a label encoder fitted on the full option set produces.
    #[must_use]
    pub fn label_encoded() -> Self {
        let map = CategoricalField::ALL
            .iter()
            .map(|cat| {
                let mut options = cat.options();
                options.sort_unstable();
                let codes = options
                    .into_iter()
                    .zip(0u32..)
                    .map(|(label, code)| (label.to_string(), code))
                    .collect();
                (cat.key().to_string(), codes)
            })
            .collect();

        match Self::from_map(map) {
            Ok(table) => table,
            Err(e) => unreachable!("label encoding covers every option: {e}"),
        }
    }

    #[must_use]
    pub fn field(&self, field: CategoricalField) -> &FieldEncoding {
        &self.tables[field.index()]
    }

    #[must_use]
    pub fn encode(&self, field: CategoricalField, value: &str) -> Option<u32> {
        self.field(field).code(value)
    }

    #[must_use]
    pub fn decode(&self, field: CategoricalField, code: u32) -> Option<&str> {
        self.field(field).label(code)
    }

    /// The `encodings.json` layout.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, BTreeMap<String, u32>> {
        CategoricalField::ALL
            .iter()
            .map(|cat| (cat.key().to_string(), self.field(*cat).codes.clone()))
            .collect()
    }
}

/// Column order the model and scaler were fitted with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureOrder {
    features: [Feature; FEATURE_COUNT],
}

impl Default for FeatureOrder {
    fn default() -> Self {
        Self {
            features: Feature::ALL,
        }
    }
}

impl FeatureOrder {
    /// Parse `feature_names.json`.
    ///
    /// Names must form a permutation of the known features. A name the
    /// encoding step never produces (say `sex_enc`) is rejected here instead
    /// of silently shifting columns.
    ///
    /// # Errors
    /// Returns `ArtifactError::Inconsistent` on unknown, duplicate or missing names.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, ArtifactError> {
        if names.len() != FEATURE_COUNT {
            return Err(ArtifactError::Inconsistent(format!(
                "feature order has {} names, expected {FEATURE_COUNT}",
                names.len()
            )));
        }

        let mut features = Feature::ALL;
        let mut seen = BTreeSet::new();
        for (slot, name) in features.iter_mut().zip(names) {
            let name = name.as_ref();
            let feature = Feature::from_name(name).ok_or_else(|| {
                ArtifactError::Inconsistent(format!("unknown feature name `{name}`"))
            })?;
            if !seen.insert(feature) {
                return Err(ArtifactError::Inconsistent(format!(
                    "duplicate feature name `{name}`"
                )));
            }
            *slot = feature;
        }

        Ok(Self { features })
    }

    pub fn iter(&self) -> impl Iterator<Item = Feature> + '_ {
        self.features.iter().copied()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Feature] {
        &self.features
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.features.iter().map(Feature::name).collect()
    }

    #[must_use]
    pub fn position(&self, feature: Feature) -> Option<usize> {
        self.features.iter().position(|f| *f == feature)
    }
}

/// `scaler.json` layout: a fitted standard scaler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerFile {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
}

/// Per-position `(mean, scale)` pairs, applied as `(x - mean) / scale`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalingParameters {
    mean: [f64; FEATURE_COUNT],
    scale: [f64; FEATURE_COUNT],
    feature_names: Option<Vec<String>>,
}

impl ScalingParameters {
    /// # Errors
    /// Returns `ArtifactError::Inconsistent` if lengths are wrong, a mean is not
    /// finite, or a scale is zero or not finite.
    pub fn new(mean: &[f64], scale: &[f64]) -> Result<Self, ArtifactError> {
        let to_array = |name: &str, values: &[f64]| -> Result<[f64; FEATURE_COUNT], ArtifactError> {
            values.try_into().map_err(|_| {
                ArtifactError::Inconsistent(format!(
                    "scaler {name} has {} values, expected {FEATURE_COUNT}",
                    values.len()
                ))
            })
        };

        let mean = to_array("mean", mean)?;
        let scale = to_array("scale", scale)?;

        if let Some(i) = mean.iter().position(|m| !m.is_finite()) {
            return Err(ArtifactError::Inconsistent(format!(
                "scaler mean at position {i} is not finite"
            )));
        }
        if let Some(i) = scale.iter().position(|s| !s.is_finite() || *s == 0.0) {
            return Err(ArtifactError::Inconsistent(format!(
                "scaler scale at position {i} must be finite and non-zero"
            )));
        }

        Ok(Self {
            mean,
            scale,
            feature_names: None,
        })
    }

    /// # Errors
    /// See [`ScalingParameters::new`].
    pub fn from_file(file: ScalerFile) -> Result<Self, ArtifactError> {
        let mut params = Self::new(&file.mean, &file.scale)?;
        params.feature_names = file.feature_names;
        Ok(params)
    }

    /// Mean 0, scale 1 everywhere.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            mean: [0.0; FEATURE_COUNT],
            scale: [1.0; FEATURE_COUNT],
            feature_names: None,
        }
    }

    #[must_use]
    pub fn mean(&self) -> &[f64; FEATURE_COUNT] {
        &self.mean
    }

    #[must_use]
    pub fn scale(&self) -> &[f64; FEATURE_COUNT] {
        &self.scale
    }

    /// Column names recorded by the scaler at fit time, if any.
    #[must_use]
    pub fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    /// Scale the value at `position`.
    #[must_use]
    pub fn apply(&self, position: usize, value: f64) -> f64 {
        (value - self.mean[position]) / self.scale[position]
    }
}

/// Everything loaded once at start-up and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub scaling: ScalingParameters,
    pub encodings: EncodingTable,
    pub order: FeatureOrder,
}

impl Artifacts {
    /// Bundle the three artifacts after checking they describe the same columns.
    ///
    /// # Errors
    /// Returns `ArtifactError::Inconsistent` if the scaler recorded column
    /// names that differ from the feature order.
    pub fn new(
        scaling: ScalingParameters,
        encodings: EncodingTable,
        order: FeatureOrder,
    ) -> Result<Self, ArtifactError> {
        if let Some(fitted) = scaling.feature_names() {
            let expected = order.names();
            if fitted.len() != expected.len()
                || fitted.iter().zip(&expected).any(|(a, b)| a != b)
            {
                return Err(ArtifactError::Inconsistent(format!(
                    "scaler was fitted on columns {fitted:?} but feature order is {expected:?}"
                )));
            }
        }

        Ok(Self {
            scaling,
            encodings,
            order,
        })
    }
}
