//! Contract violations raised by the per-request pipeline.
//!
//! None of these occur for a record that passed validation and a classifier
//! that honors its output range; they indicate a caller defect.

/// Error type for normalization and interpretation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Field {field} must be {expected}")]
    FieldType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("No encoding for {field} value {value:?}")]
    KeyNotFound { field: &'static str, value: String },

    #[error("Classifier returned unknown severity class {0}")]
    UnknownClass(usize),
}
