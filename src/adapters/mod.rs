//! Adapters layer: Concrete implementations of ports and I/O.
//!
//! - `artifacts`: loading and signature checks for preprocessing artifacts
//! - `softmax`: reference severity classifier
//! - `sanitize`: clinical-value filtering for logs

pub mod artifacts;
pub mod sanitize;
pub mod softmax;

pub use artifacts::{load_artifacts, ArtifactPolicy};
pub use softmax::{SoftmaxClassifier, SoftmaxModel};
