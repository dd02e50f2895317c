//! Application layer: The per-request pipeline.
//!
//! Validator, normalizer, predictor adapter and interpreter, plus the
//! service that runs them in order.

mod inference;
mod interpret;
mod normalize;
mod validation;

pub use inference::{predict, prepare, PredictionService};
pub use interpret::interpret;
pub use normalize::normalize;
pub use validation::validate;
