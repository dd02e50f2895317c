//! Domain layer: Core types for the severity pipeline.
//!
//! Pure data and lookups; nothing here touches the filesystem or logs beyond
//! load-time warnings.

mod artifacts;
pub mod catalog;
mod diagnosis;
mod error;
mod features;
mod patient;

pub use artifacts::{
    ArtifactError, Artifacts, EncodingTable, FeatureOrder, FieldEncoding, ScalerFile,
    ScalingParameters,
};
pub use catalog::{form_options, FormOptions};
pub use diagnosis::{Assessment, Prediction, PredictionResult, SeverityLevel, SEVERITY_LEVELS};
pub use error::PipelineError;
pub use features::{CategoricalField, Feature, NormalizedVector, FEATURE_COUNT};
pub use patient::{
    ChestPain, ClinicalRecord, Field, FieldKind, FieldValue, RawInput, RestingEcg, Sex, StSlope,
    Thalassemia,
};
