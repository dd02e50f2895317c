//! Model feature identifiers and the scaled feature vector.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::patient::{ChestPain, Field, RestingEcg, Sex, StSlope, Thalassemia};

/// Number of features the severity model consumes.
pub const FEATURE_COUNT: usize = 13;

/// Form fields whose values are replaced by an integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CategoricalField {
    Sex,
    FastingBloodSugar,
    ExerciseAngina,
    ChestPain,
    RestingEcg,
    Slope,
    Thal,
}

impl CategoricalField {
    pub const ALL: [Self; 7] = [
        Self::Sex,
        Self::FastingBloodSugar,
        Self::ExerciseAngina,
        Self::ChestPain,
        Self::RestingEcg,
        Self::Slope,
        Self::Thal,
    ];

    #[must_use]
    pub fn field(&self) -> Field {
        match self {
            Self::Sex => Field::Sex,
            Self::FastingBloodSugar => Field::FastingBloodSugar,
            Self::ExerciseAngina => Field::ExerciseAngina,
            Self::ChestPain => Field::ChestPain,
            Self::RestingEcg => Field::RestingEcg,
            Self::Slope => Field::Slope,
            Self::Thal => Field::Thal,
        }
    }

    #[must_use]
    pub fn from_field(field: Field) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.field() == field)
    }

    /// Key of this field in `encodings.json`.
    #[must_use]
    pub fn key(&self) -> &'static str {
        self.field().key()
    }

    /// Feature column holding the encoded value.
    #[must_use]
    pub fn feature(&self) -> Feature {
        match self {
            Self::Sex => Feature::SexEncoded,
            Self::FastingBloodSugar => Feature::FbsEncoded,
            Self::ExerciseAngina => Feature::ExangEncoded,
            Self::ChestPain => Feature::CpEncoded,
            Self::RestingEcg => Feature::RestecgEncoded,
            Self::Slope => Feature::SlopeEncoded,
            Self::Thal => Feature::ThalEncoded,
        }
    }

    /// Legal values, as keyed in the encoding table.
    #[must_use]
    pub fn options(&self) -> Vec<&'static str> {
        match self {
            Self::Sex => Sex::labels(),
            Self::FastingBloodSugar | Self::ExerciseAngina => vec!["true", "false"],
            Self::ChestPain => ChestPain::labels(),
            Self::RestingEcg => RestingEcg::labels(),
            Self::Slope => StSlope::labels(),
            Self::Thal => Thalassemia::labels(),
        }
    }

    pub(crate) fn index(&self) -> usize {
        *self as usize
    }
}

/// One column of the model input.
///
/// Declaration order is the column order the shipped scaler was fitted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    #[serde(rename = "age")]
    Age,
    #[serde(rename = "trestbps")]
    RestingBp,
    #[serde(rename = "chol")]
    Cholesterol,
    #[serde(rename = "thalch")]
    MaxHeartRate,
    #[serde(rename = "oldpeak")]
    StDepression,
    #[serde(rename = "ca")]
    Vessels,
    SexEncoded,
    FbsEncoded,
    ExangEncoded,
    CpEncoded,
    RestecgEncoded,
    SlopeEncoded,
    ThalEncoded,
}

impl Feature {
    pub const ALL: [Self; FEATURE_COUNT] = [
        Self::Age,
        Self::RestingBp,
        Self::Cholesterol,
        Self::MaxHeartRate,
        Self::StDepression,
        Self::Vessels,
        Self::SexEncoded,
        Self::FbsEncoded,
        Self::ExangEncoded,
        Self::CpEncoded,
        Self::RestecgEncoded,
        Self::SlopeEncoded,
        Self::ThalEncoded,
    ];

    /// Column name as written in `feature_names.json`.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Age => "age",
            Self::RestingBp => "trestbps",
            Self::Cholesterol => "chol",
            Self::MaxHeartRate => "thalch",
            Self::StDepression => "oldpeak",
            Self::Vessels => "ca",
            Self::SexEncoded => "sex_encoded",
            Self::FbsEncoded => "fbs_encoded",
            Self::ExangEncoded => "exang_encoded",
            Self::CpEncoded => "cp_encoded",
            Self::RestecgEncoded => "restecg_encoded",
            Self::SlopeEncoded => "slope_encoded",
            Self::ThalEncoded => "thal_encoded",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Form field the column is derived from.
    #[must_use]
    pub fn source(&self) -> Field {
        match self {
            Self::Age => Field::Age,
            Self::RestingBp => Field::RestingBp,
            Self::Cholesterol => Field::Cholesterol,
            Self::MaxHeartRate => Field::MaxHeartRate,
            Self::StDepression => Field::StDepression,
            Self::Vessels => Field::Vessels,
            Self::SexEncoded => Field::Sex,
            Self::FbsEncoded => Field::FastingBloodSugar,
            Self::ExangEncoded => Field::ExerciseAngina,
            Self::CpEncoded => Field::ChestPain,
            Self::RestecgEncoded => Field::RestingEcg,
            Self::SlopeEncoded => Field::Slope,
            Self::ThalEncoded => Field::Thal,
        }
    }

    pub(crate) fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Scaled model input, one value per feature-order position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedVector([f64; FEATURE_COUNT]);

impl NormalizedVector {
    #[must_use]
    pub fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        FEATURE_COUNT
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().copied()
    }

    #[must_use]
    pub fn into_inner(self) -> [f64; FEATURE_COUNT] {
        self.0
    }
}
