//! Ports layer: Trait definitions for external collaborators.
//!
//! Following Hexagonal Architecture, these traits define the boundary
//! between the pipeline and the externally trained model.

mod classifier;

pub use classifier::{ClassProbabilities, ClassifierError, SeverityClassifier};
