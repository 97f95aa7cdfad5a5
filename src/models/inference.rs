//! Scoring engine guarding the model behind the fixed feature schema

use crate::assembler::{ModelFeatureVector, FEATURE_COUNT, MODEL_COLUMNS};
use crate::error::{Result, RiskError};
use crate::models::loader::{ModelFormat, ModelLoader};
use crate::models::RiskModel;
use std::path::Path;
use tracing::{debug, info};

/// Loaded model plus the schema checks around every call.
///
/// Built once at startup and shared read-only; `predict` takes `&self`.
pub struct ScoringEngine {
    model: Box<dyn RiskModel>,
}

impl std::fmt::Debug for ScoringEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoringEngine")
            .field("model", &self.model.name())
            .finish()
    }
}

impl ScoringEngine {
    /// Load a model artifact and verify it against the feature schema.
    pub fn load<P: AsRef<Path>>(path: P, format: ModelFormat, onnx_threads: usize) -> Result<Self> {
        let loader = ModelLoader::with_threads(onnx_threads);
        Self::from_model(loader.load(path, format)?)
    }

    /// Wrap an already loaded model.
    ///
    /// # Errors
    /// Returns `SchemaMismatch` if the model declares a feature count or
    /// feature names that differ from the assembler's schema.
    pub fn from_model(model: Box<dyn RiskModel>) -> Result<Self> {
        if let Some(count) = model.num_features() {
            if count != FEATURE_COUNT {
                return Err(RiskError::SchemaMismatch(format!(
                    "model {} expects {} features, schema has {}",
                    model.name(),
                    count,
                    FEATURE_COUNT
                )));
            }
        }

        if let Some(names) = model.feature_names() {
            if names.len() != FEATURE_COUNT {
                return Err(RiskError::SchemaMismatch(format!(
                    "model {} names {} features, schema has {}",
                    model.name(),
                    names.len(),
                    FEATURE_COUNT
                )));
            }
            if let Some((idx, (found, expected))) = names
                .iter()
                .zip(MODEL_COLUMNS.iter())
                .enumerate()
                .find(|(_, (found, expected))| found != expected)
            {
                return Err(RiskError::SchemaMismatch(format!(
                    "column {} is {:?} in model {} but {:?} in schema",
                    idx,
                    found,
                    model.name(),
                    expected
                )));
            }
        }

        info!(
            model = %model.name(),
            features = FEATURE_COUNT,
            "Scoring engine initialized"
        );

        Ok(Self { model })
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Score one assembled vector.
    ///
    /// # Errors
    /// Returns `SchemaMismatch` if the vector does not follow the model
    /// schema, `Inference` if the model fails or yields a value outside [0, 1].
    pub fn predict(&self, vector: &ModelFeatureVector) -> Result<f64> {
        if vector.columns() != MODEL_COLUMNS {
            return Err(RiskError::SchemaMismatch(format!(
                "vector columns {:?} do not follow the model schema",
                vector.columns()
            )));
        }

        let probability = self.model.predict_proba(vector.values())?;
        if !(0.0..=1.0).contains(&probability) {
            return Err(RiskError::Inference(format!(
                "model {} returned probability {} outside [0, 1]",
                self.model.name(),
                probability
            )));
        }

        debug!(model = %self.model.name(), probability = probability, "Inference complete");
        Ok(probability)
    }
}
