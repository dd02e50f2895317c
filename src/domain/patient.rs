//! Patient form data for heart-disease severity prediction.
//!
//! Field names follow the UCI Cleveland heart-disease columns the model was
//! trained on (`age`, `sex`, `cp`, `trestbps`, ...).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single value entered in the web form.
///
/// JSON numbers without a fractional part deserialize as `Int`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Real(f64),
    Text(String),
}

impl FieldValue {
    /// Numeric view of the value. Integers are widened to `f64`.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Real(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Real(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// How a form field is interpreted by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Copied verbatim into the feature vector.
    Numeric,
    /// Yes/no flag, encoded through the encoding table.
    Flag,
    /// Enumerated string, encoded through the encoding table.
    Categorical,
}

/// The thirteen fields of the patient form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Age,
    Sex,
    ChestPain,
    RestingBp,
    Cholesterol,
    FastingBloodSugar,
    RestingEcg,
    MaxHeartRate,
    ExerciseAngina,
    StDepression,
    Slope,
    Vessels,
    Thal,
}

impl Field {
    /// All fields, in form order.
    pub const ALL: [Self; 13] = [
        Self::Age,
        Self::Sex,
        Self::ChestPain,
        Self::RestingBp,
        Self::Cholesterol,
        Self::FastingBloodSugar,
        Self::RestingEcg,
        Self::MaxHeartRate,
        Self::ExerciseAngina,
        Self::StDepression,
        Self::Slope,
        Self::Vessels,
        Self::Thal,
    ];

    /// Key of the field in a [`RawInput`].
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Self::Age => "age",
            Self::Sex => "sex",
            Self::ChestPain => "cp",
            Self::RestingBp => "trestbps",
            Self::Cholesterol => "chol",
            Self::FastingBloodSugar => "fbs",
            Self::RestingEcg => "restecg",
            Self::MaxHeartRate => "thalch",
            Self::ExerciseAngina => "exang",
            Self::StDepression => "oldpeak",
            Self::Slope => "slope",
            Self::Vessels => "ca",
            Self::Thal => "thal",
        }
    }

    /// Human-readable label used in validation messages.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Age => "Age",
            Self::Sex => "Sex",
            Self::ChestPain => "Chest pain type",
            Self::RestingBp => "Blood pressure",
            Self::Cholesterol => "Cholesterol",
            Self::FastingBloodSugar => "Fasting blood sugar",
            Self::RestingEcg => "Resting ECG",
            Self::MaxHeartRate => "Max heart rate",
            Self::ExerciseAngina => "Exercise induced angina",
            Self::StDepression => "ST depression",
            Self::Slope => "ST slope",
            Self::Vessels => "Number of vessels",
            Self::Thal => "Thalassemia",
        }
    }

    #[must_use]
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Age
            | Self::RestingBp
            | Self::Cholesterol
            | Self::MaxHeartRate
            | Self::StDepression
            | Self::Vessels => FieldKind::Numeric,
            Self::FastingBloodSugar | Self::ExerciseAngina => FieldKind::Flag,
            Self::Sex | Self::ChestPain | Self::RestingEcg | Self::Slope | Self::Thal => {
                FieldKind::Categorical
            }
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Raw form submission: field key to entered value.
///
/// Nothing about the record is checked on construction; see
/// [`crate::application::validate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawInput {
    fields: BTreeMap<String, FieldValue>,
}

impl RawInput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a value, returning the previous one.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Option<FieldValue> {
        self.fields.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.fields.remove(key)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Value of a known form field.
    #[must_use]
    pub fn field(&self, field: Field) -> Option<&FieldValue> {
        self.fields.get(field.key())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K, V> FromIterator<(K, V)> for RawInput
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

macro_rules! form_options {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            /// Every legal value, in form display order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Value as entered in the form and keyed in the encoding table.
            #[must_use]
            pub fn label(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }

            #[must_use]
            pub fn from_label(label: &str) -> Option<Self> {
                match label {
                    $($label => Some(Self::$variant),)+
                    _ => None,
                }
            }

            /// Labels of every legal value.
            #[must_use]
            pub fn labels() -> Vec<&'static str> {
                Self::ALL.iter().map(Self::label).collect()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

form_options! {
    /// Patient sex.
    Sex {
        Male => "Male",
        Female => "Female",
    }
}

form_options! {
    /// Chest pain type (`cp`).
    ChestPain {
        TypicalAngina => "typical angina",
        AtypicalAngina => "atypical angina",
        NonAnginal => "non-anginal",
        Asymptomatic => "asymptomatic",
    }
}

form_options! {
    /// Resting electrocardiographic result (`restecg`).
    RestingEcg {
        Normal => "normal",
        StTAbnormality => "st-t abnormality",
        LvHypertrophy => "lv hypertrophy",
    }
}

form_options! {
    /// Slope of the peak exercise ST segment (`slope`).
    StSlope {
        Upsloping => "upsloping",
        Flat => "flat",
        Downsloping => "downsloping",
    }
}

form_options! {
    /// Thalassemia type (`thal`).
    Thalassemia {
        Normal => "normal",
        FixedDefect => "fixed defect",
        ReversableDefect => "reversable defect",
    }
}

/// Strongly typed patient record.
///
/// Converts into a [`RawInput`] whose categorical values are always legal
/// form options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalRecord {
    /// Age in years
    pub age: f64,
    pub sex: Sex,
    pub chest_pain: ChestPain,
    /// Resting blood pressure in mmHg
    pub resting_bp: f64,
    /// Serum cholesterol in mg/dl
    pub cholesterol: f64,
    /// Fasting blood sugar > 120 mg/dl
    pub fasting_blood_sugar: bool,
    pub resting_ecg: RestingEcg,
    /// Maximum heart rate achieved
    pub max_heart_rate: f64,
    pub exercise_angina: bool,
    /// ST depression induced by exercise relative to rest
    pub st_depression: f64,
    pub slope: StSlope,
    /// Major vessels colored by fluoroscopy (0-3)
    pub vessels: f64,
    pub thal: Thalassemia,
}

impl ClinicalRecord {
    /// The worked example from the integration guide.
    #[must_use]
    pub fn example() -> Self {
        Self {
            age: 63.0,
            sex: Sex::Male,
            chest_pain: ChestPain::TypicalAngina,
            resting_bp: 145.0,
            cholesterol: 233.0,
            fasting_blood_sugar: true,
            resting_ecg: RestingEcg::LvHypertrophy,
            max_heart_rate: 150.0,
            exercise_angina: false,
            st_depression: 2.3,
            slope: StSlope::Downsloping,
            vessels: 0.0,
            thal: Thalassemia::FixedDefect,
        }
    }

    #[must_use]
    pub fn to_raw(&self) -> RawInput {
        RawInput::new()
            .with(Field::Age.key(), self.age)
            .with(Field::Sex.key(), self.sex.label())
            .with(Field::ChestPain.key(), self.chest_pain.label())
            .with(Field::RestingBp.key(), self.resting_bp)
            .with(Field::Cholesterol.key(), self.cholesterol)
            .with(Field::FastingBloodSugar.key(), self.fasting_blood_sugar)
            .with(Field::RestingEcg.key(), self.resting_ecg.label())
            .with(Field::MaxHeartRate.key(), self.max_heart_rate)
            .with(Field::ExerciseAngina.key(), self.exercise_angina)
            .with(Field::StDepression.key(), self.st_depression)
            .with(Field::Slope.key(), self.slope.label())
            .with(Field::Vessels.key(), self.vessels)
            .with(Field::Thal.key(), self.thal.label())
    }
}

impl From<&ClinicalRecord> for RawInput {
    fn from(record: &ClinicalRecord) -> Self {
        record.to_raw()
    }
}
