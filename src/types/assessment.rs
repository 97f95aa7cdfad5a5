//! Assessment result data structures

use crate::decision::{Decision, Verdict};
use crate::encoder::EncodedFeatureMap;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Scored assessment returned for one request
#[derive(Debug, Clone, Serialize)]
pub struct Assessment {
    /// Unique assessment identifier
    pub assessment_id: String,

    /// Identifier of the originating request
    pub request_id: String,

    /// Model probability (0.0 - 1.0)
    pub probability: f64,

    pub verdict: Verdict,

    /// Human-readable verdict
    pub message: String,

    /// Threshold the verdict was decided against
    pub threshold: f64,

    /// Encoded form values, including columns the model does not use
    pub features: EncodedFeatureMap,

    pub timestamp: DateTime<Utc>,
}

impl Assessment {
    /// Create a new assessment from a decision
    pub fn new(request_id: String, decision: Decision, threshold: f64) -> Self {
        Self {
            assessment_id: uuid::Uuid::new_v4().to_string(),
            request_id,
            probability: decision.probability,
            verdict: decision.verdict,
            message: decision.verdict.message().to_string(),
            threshold,
            features: EncodedFeatureMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// Attach the encoded features for display
    pub fn with_features(mut self, features: EncodedFeatureMap) -> Self {
        self.features = features;
        self
    }
}

/// Request that could not be scored
#[derive(Debug, Clone, Serialize)]
pub struct Rejection {
    pub request_id: String,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

impl Rejection {
    pub fn new(request_id: String, error: impl ToString) -> Self {
        Self {
            request_id,
            error: error.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Message published on the result subject
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AssessmentOutcome {
    Scored(Assessment),
    Rejected(Rejection),
}

impl AssessmentOutcome {
    pub fn request_id(&self) -> &str {
        match self {
            Self::Scored(assessment) => &assessment.request_id,
            Self::Rejected(rejection) => &rejection.request_id,
        }
    }
}
