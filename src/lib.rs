//! Alzheimer's Risk Scoring Library
//!
//! Turns a completed lifestyle and health questionnaire into the feature
//! vector of a pre-trained gradient-boosted tree classifier, scores it and
//! applies a fixed decision threshold. The worker binary serves this over
//! NATS.

pub mod assembler;
pub mod catalog;
pub mod config;
pub mod consumer;
pub mod decision;
pub mod encoder;
pub mod error;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod producer;
pub mod types;

pub use assembler::{FeatureAssembler, ModelFeatureVector, MODEL_COLUMNS};
pub use config::AppConfig;
pub use consumer::AssessmentConsumer;
pub use decision::{Decision, DecisionPolicy, Verdict};
pub use encoder::{encode_input, EncodedFeatureMap};
pub use error::{Result, RiskError};
pub use models::ScoringEngine;
pub use pipeline::RiskPipeline;
pub use producer::ResultProducer;
pub use types::{Assessment, AssessmentOutcome, AssessmentRequest, RawInput, RawValue};
