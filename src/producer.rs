//! NATS message producer for assessment results

use crate::types::AssessmentOutcome;
use anyhow::Result;
use async_nats::{Client, Subject};
use tracing::debug;

/// Producer for publishing assessment outcomes to NATS
#[derive(Clone)]
pub struct ResultProducer {
    client: Client,
    subject: String,
}

impl ResultProducer {
    /// Create a new result producer
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Publish a scored assessment or a rejection
    pub async fn publish(&self, outcome: &AssessmentOutcome) -> Result<()> {
        let payload = serde_json::to_vec(outcome)?;

        self.client
            .publish(self.subject.clone(), payload.into())
            .await?;

        match outcome {
            AssessmentOutcome::Scored(assessment) => debug!(
                assessment_id = %assessment.assessment_id,
                request_id = %assessment.request_id,
                probability = assessment.probability,
                verdict = %assessment.verdict,
                "Published assessment"
            ),
            AssessmentOutcome::Rejected(rejection) => debug!(
                request_id = %rejection.request_id,
                error = %rejection.error,
                "Published rejection"
            ),
        }

        Ok(())
    }

    /// Answer a request/reply caller directly on its inbox
    pub async fn respond(&self, reply: Subject, outcome: &AssessmentOutcome) -> Result<()> {
        let payload = serde_json::to_vec(outcome)?;
        self.client.publish(reply, payload.into()).await?;
        debug!(request_id = %outcome.request_id(), "Answered request");
        Ok(())
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}
