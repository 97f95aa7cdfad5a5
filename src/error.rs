//! Error types for the risk pipeline

use std::path::PathBuf;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, RiskError>;

/// Main error type for the risk pipeline
#[derive(Debug, thiserror::Error)]
pub enum RiskError {
    /// A raw field value was rejected before encoding
    #[error("invalid value {value:?} for field `{field}`: {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// The model artifact could not be loaded; the worker cannot serve without it
    #[error("failed to load model from {}: {reason}", path.display())]
    ModelLoad { path: PathBuf, reason: String },

    /// Feature vector layout disagrees with what the model expects
    #[error("feature schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("decision threshold {0} must lie in [0, 1]")]
    InvalidThreshold(f64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RiskError {
    pub(crate) fn invalid_input(
        field: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidInput {
            field: field.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn model_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ModelLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error is local to one request (as opposed to fatal for the worker)
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. } | Self::SchemaMismatch(_) | Self::Inference(_)
        )
    }
}
