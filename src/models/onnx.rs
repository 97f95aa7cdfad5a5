//! ONNX Runtime backend for exported tree ensembles

use crate::error::{Result, RiskError};
use crate::models::RiskModel;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Risk model backed by an ONNX Runtime session
pub struct OnnxModel {
    name: String,
    /// Running a session needs exclusive access
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
}

impl OnnxModel {
    /// Load an ONNX model from file
    pub fn load(path: &Path, onnx_threads: usize) -> Result<Self> {
        ort::init().commit().map_err(|e| RiskError::model_load(path, e))?;
        info!(path = %path.display(), threads = onnx_threads, "Loading ONNX model");

        let session = Session::builder()
            .map_err(|e| RiskError::model_load(path, e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| RiskError::model_load(path, e))?
            .with_intra_threads(onnx_threads)
            .map_err(|e| RiskError::model_load(path, e))?
            .commit_from_file(path)
            .map_err(|e| RiskError::model_load(path, e))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .or_else(|| session.outputs.last())
            .map(|o| o.name.clone())
            .unwrap_or_else(|| "probabilities".to_string());

        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "onnx".to_string());

        info!(
            model = %name,
            input = %input_name,
            output = %output_name,
            "Model loaded successfully"
        );

        Ok(Self {
            name,
            session: Mutex::new(session),
            input_name,
            output_name,
        })
    }
}

fn inference_err(e: impl std::fmt::Display) -> RiskError {
    RiskError::Inference(e.to_string())
}

/// Positive-class probability from a `[1, classes]`, `[classes]` or `[1]` tensor
fn positive_probability(dims: &[i64], data: &[f32]) -> Option<f64> {
    let classes = dims.last().copied().unwrap_or(data.len() as i64);
    match classes {
        c if c >= 2 => data.get(1).map(|&p| p as f64),
        1 => data.first().map(|&p| p as f64),
        _ => None,
    }
}

impl RiskModel for OnnxModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn num_features(&self) -> Option<usize> {
        None
    }

    fn feature_names(&self) -> Option<&[String]> {
        None
    }

    fn predict_proba(&self, features: &[f32]) -> Result<f64> {
        let shape = vec![1_i64, features.len() as i64];
        let input_tensor = Tensor::from_array((shape, features.to_vec())).map_err(inference_err)?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| RiskError::Inference(format!("Lock error: {}", e)))?;
        let outputs = session
            .run(ort::inputs![&self.input_name => input_tensor])
            .map_err(inference_err)?;

        let output = outputs.get(self.output_name.as_str()).ok_or_else(|| {
            RiskError::Inference(format!("model has no output named {}", self.output_name))
        })?;
        let (shape, data) = output.try_extract_tensor::<f32>().map_err(inference_err)?;
        let dims: Vec<i64> = shape.iter().copied().collect();

        let probability = positive_probability(&dims, data).ok_or_else(|| {
            RiskError::Inference(format!("unexpected probability tensor shape {:?}", dims))
        })?;
        debug!(model = %self.name, probability = probability, "Extracted from tensor");
        Ok(probability)
    }
}
