//! Configuration management for the risk scoring worker

use crate::decision::DEFAULT_THRESHOLD;
use crate::models::ModelFormat;
use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable overriding the configuration file path
pub const CONFIG_PATH_ENV: &str = "ALZHEIMER_RISK_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub model: ModelConfig,
    #[serde(default)]
    pub decision: DecisionConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming assessment requests
    pub request_subject: String,
    /// Subject for outgoing assessment results
    pub result_subject: String,
}

/// Model artifact configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Path to the model artifact
    pub path: PathBuf,
    /// Artifact format: "xgboost_json" or "onnx". Guessed from the file
    /// extension when omitted.
    #[serde(default)]
    pub format: Option<ModelFormat>,
    /// Number of threads for ONNX inference (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

impl ModelConfig {
    /// Configured format, else the one implied by the path, else XGBoost JSON
    pub fn resolved_format(&self) -> ModelFormat {
        self.format
            .or_else(|| ModelFormat::from_path(&self.path))
            .unwrap_or_default()
    }
}

fn default_onnx_threads() -> usize {
    1
}

/// Decision configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionConfig {
    /// Probability strictly above which the verdict is "likely"
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Maximum number of requests scored concurrently
    pub workers: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

/// Metrics reporting configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Seconds between periodic summaries
    pub report_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: 30,
        }
    }
}

impl AppConfig {
    /// Load configuration from `$ALZHEIMER_RISK_CONFIG` or the default file
    pub fn load() -> Result<Self> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the worker cannot start with
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.decision.threshold) {
            anyhow::bail!(
                "decision.threshold must lie in [0, 1], got {}",
                self.decision.threshold
            );
        }
        if self.pipeline.workers == 0 {
            anyhow::bail!("pipeline.workers must be at least 1");
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                request_subject: "assessments.requests".to_string(),
                result_subject: "assessments.results".to_string(),
            },
            model: ModelConfig {
                path: PathBuf::from("models/xgb_model3.json"),
                format: Some(ModelFormat::XgboostJson),
                onnx_threads: 1,
            },
            decision: DecisionConfig::default(),
            pipeline: PipelineConfig { workers: 4 },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "json".to_string(),
            },
            metrics: MetricsConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.nats.url, "nats://localhost:4222");
        assert_eq!(config.decision.threshold, 0.6);
        assert_eq!(config.model.resolved_format(), ModelFormat::XgboostJson);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[nats]
url = "nats://broker:4222"
request_subject = "req"
result_subject = "res"

[model]
path = "models/test.onnx"
format = "onnx"

[decision]
threshold = 0.7

[pipeline]
workers = 2

[logging]
level = "debug"
format = "pretty"
"#
        )
        .unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.nats.url, "nats://broker:4222");
        assert_eq!(config.model.format, Some(ModelFormat::Onnx));
        assert_eq!(config.model.onnx_threads, 1);
        assert_eq!(config.decision.threshold, 0.7);
        assert_eq!(config.metrics.report_interval_secs, 30);
    }

    #[test]
    fn test_model_format_falls_back_to_extension() {
        let mut model = AppConfig::default().model;
        model.format = None;
        model.path = PathBuf::from("models/exported.onnx");
        assert_eq!(model.resolved_format(), ModelFormat::Onnx);

        model.path = PathBuf::from("models/xgb_model3.json");
        assert_eq!(model.resolved_format(), ModelFormat::XgboostJson);

        model.path = PathBuf::from("models/unknown.bin");
        assert_eq!(model.resolved_format(), ModelFormat::XgboostJson);

        model.format = Some(ModelFormat::XgboostJson);
        model.path = PathBuf::from("models/exported.onnx");
        assert_eq!(model.resolved_format(), ModelFormat::XgboostJson);
    }

    #[test]
    fn test_invalid_threshold_is_rejected() {
        let mut config = AppConfig::default();
        config.decision.threshold = 1.2;
        assert!(config.validate().is_err());
    }
}
