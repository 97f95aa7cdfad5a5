//! Model artifact loader

use crate::error::{Result, RiskError};
use crate::models::xgboost::XgbForest;
use crate::models::RiskModel;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// On-disk format of the model artifact
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModelFormat {
    /// XGBoost JSON booster, evaluated natively
    #[default]
    XgboostJson,
    /// ONNX graph run through ONNX Runtime (requires the `onnx` feature)
    Onnx,
}

impl ModelFormat {
    /// Guess the format from the file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "json" => Some(Self::XgboostJson),
            "onnx" => Some(Self::Onnx),
            _ => None,
        }
    }
}

/// Loader for risk model artifacts
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with default settings (1 thread)
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    /// Create a new model loader with specified number of ONNX threads
    pub fn with_threads(onnx_threads: usize) -> Self {
        Self { onnx_threads }
    }

    /// Load a model artifact.
    ///
    /// # Errors
    /// Returns `ModelLoad` if the file is missing, corrupt, or of a format
    /// this build cannot run.
    pub fn load<P: AsRef<Path>>(&self, path: P, format: ModelFormat) -> Result<Box<dyn RiskModel>> {
        let path = path.as_ref();

        info!(path = %path.display(), format = ?format, "Loading risk model");

        if !path.exists() {
            return Err(RiskError::model_load(path, "file not found"));
        }

        match format {
            ModelFormat::XgboostJson => {
                let forest = XgbForest::load(path)?;
                info!(
                    model = %forest.name(),
                    trees = forest.num_trees(),
                    features = ?forest.num_features(),
                    "Model loaded successfully"
                );
                Ok(Box::new(forest))
            }
            ModelFormat::Onnx => self.load_onnx(path),
        }
    }

    #[cfg(feature = "onnx")]
    fn load_onnx(&self, path: &Path) -> Result<Box<dyn RiskModel>> {
        let model = crate::models::onnx::OnnxModel::load(path, self.onnx_threads)?;
        Ok(Box::new(model))
    }

    #[cfg(not(feature = "onnx"))]
    fn load_onnx(&self, path: &Path) -> Result<Box<dyn RiskModel>> {
        tracing::error!(threads = self.onnx_threads, "ONNX support not compiled in");
        Err(RiskError::model_load(
            path,
            "ONNX models require the `onnx` feature",
        ))
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}
