//! Type definitions for the risk pipeline

pub mod assessment;
pub mod input;

pub use assessment::{Assessment, AssessmentOutcome, Rejection};
pub use input::{AssessmentRequest, RawInput, RawValue};
