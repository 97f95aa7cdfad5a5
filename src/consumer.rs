//! NATS message consumer for incoming assessment requests

use crate::error::{Result as RiskResult, RiskError};
use crate::types::AssessmentRequest;
use anyhow::Result;
use async_nats::{Client, Subscriber};
use tracing::info;

/// Consumer for receiving assessment requests from NATS
pub struct AssessmentConsumer {
    client: Client,
    subject: String,
}

impl AssessmentConsumer {
    /// Create a new assessment consumer
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Subscribe to the request subject
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(self.subject.clone()).await?;
        info!(subject = %self.subject, "Subscribed to assessment request subject");
        Ok(subscriber)
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

/// Decode a request payload.
///
/// Individual field values are not checked here. Payloads that are not JSON
/// objects with a `fields` map are reported as invalid input on the
/// `payload` pseudo-field.
pub fn decode_request(payload: &[u8]) -> RiskResult<AssessmentRequest> {
    serde_json::from_slice(payload).map_err(|e| {
        let preview: String = String::from_utf8_lossy(payload).chars().take(64).collect();
        RiskError::invalid_input("payload", preview, e.to_string())
    })
}

/// Best-effort `request_id` of a payload that failed to decode
pub fn request_id_hint(payload: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(payload).ok()?;
    value.get("request_id")?.as_str().map(str::to_string)
}
