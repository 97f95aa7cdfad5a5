//! Risk model loading and inference components

pub mod inference;
pub mod loader;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod xgboost;

pub use inference::ScoringEngine;
pub use loader::{ModelFormat, ModelLoader};
pub use xgboost::XgbForest;

use crate::error::Result;

/// Opaque scoring function over an assembled feature vector.
///
/// Implementations are shared read-only across concurrent requests.
pub trait RiskModel: Send + Sync {
    fn name(&self) -> &str;

    /// Number of input features, when the artifact records it
    fn num_features(&self) -> Option<usize>;

    /// Training column names, when the artifact records them
    fn feature_names(&self) -> Option<&[String]>;

    /// Positive-class probability for one feature row
    fn predict_proba(&self, features: &[f32]) -> Result<f64>;
}
