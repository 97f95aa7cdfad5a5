//! Test Request Producer
//!
//! Generates and publishes assessment requests to NATS for pipeline testing.

use alzheimer_risk::catalog::{Field, FieldKind};
use alzheimer_risk::types::{AssessmentRequest, RawInput, RawValue};
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

/// Request generator for testing
struct RequestGenerator {
    rng: rand::rngs::ThreadRng,
    request_counter: u64,
}

impl RequestGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            request_counter: 0,
        }
    }

    fn next_id(&mut self) -> String {
        self.request_counter += 1;
        format!("req_{:012}", self.request_counter)
    }

    /// Any in-range value for a field
    fn random_value(&mut self, field: Field) -> RawValue {
        match field.kind() {
            FieldKind::Numeric(range) => RawValue::Number(self.rng.gen_range(range.min..=range.max)),
            FieldKind::Categorical(labels) => {
                RawValue::from(labels[self.rng.gen_range(0..labels.len())])
            }
        }
    }

    /// Generate a request with every field drawn uniformly
    fn generate_random(&mut self) -> AssessmentRequest {
        let fields: RawInput = Field::ALL
            .iter()
            .map(|&field| (field.name(), self.random_value(field)))
            .collect();

        AssessmentRequest {
            request_id: self.next_id(),
            fields,
        }
    }

    /// Generate an older profile with a weak cognitive test result
    fn generate_elevated(&mut self) -> AssessmentRequest {
        let mut request = self.generate_random();
        request
            .fields
            .set(Field::Age.name(), self.rng.gen_range(70..=100));
        request
            .fields
            .set(Field::CognitiveTestScore.name(), self.rng.gen_range(0..=45));
        request.fields.set(Field::FamilyHistory.name(), "Yes");
        request.fields.set(Field::GeneticRiskFactor.name(), "Yes");
        request
    }

    /// Generate a request the worker must reject
    fn generate_invalid(&mut self) -> AssessmentRequest {
        let mut request = self.generate_random();
        match self.rng.gen_range(0..3) {
            0 => request.fields.set(Field::Age.name(), 140),
            1 => request.fields.set(Field::SleepQuality.name(), "Excellent"),
            _ => request.fields.set("Favourite Colour", "Blue"),
        }
        request
    }

    fn generate(&mut self, elevated_rate: f64, invalid_rate: f64) -> (&'static str, AssessmentRequest) {
        let roll: f64 = self.rng.gen();
        if roll < invalid_rate {
            ("invalid", self.generate_invalid())
        } else if roll < invalid_rate + elevated_rate {
            ("elevated", self.generate_elevated())
        } else {
            ("random", self.generate_random())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_producer=info".parse()?),
        )
        .init();

    info!("Starting Test Request Producer");

    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("assessments.requests");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);
    let elevated_rate: f64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(0.3);
    let invalid_rate: f64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(0.05);
    let delay_ms: u64 = args.get(6).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        elevated_rate = elevated_rate,
        invalid_rate = invalid_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, elevated_rate, invalid_rate, delay_ms).await;
        }
    };

    let mut generator = RequestGenerator::new();
    let mut elevated_count = 0;
    let mut invalid_count = 0;

    info!("Starting to publish {} requests...", count);

    for i in 0..count {
        let (kind, request) = generator.generate(elevated_rate, invalid_rate);
        match kind {
            "elevated" => elevated_count += 1,
            "invalid" => invalid_count += 1,
            _ => {}
        }

        let payload = serde_json::to_vec(&request)?;
        client.publish(subject.to_string(), payload.into()).await?;

        if (i + 1) % 10 == 0 {
            info!(
                "Published {}/{} requests ({} elevated, {} invalid)",
                i + 1,
                count,
                elevated_count,
                invalid_count
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    client.flush().await?;
    info!(
        "Completed! Published {} requests ({} elevated, {} invalid)",
        count, elevated_count, invalid_count
    );

    Ok(())
}

async fn run_dry_mode(
    count: u64,
    elevated_rate: f64,
    invalid_rate: f64,
    delay_ms: u64,
) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = RequestGenerator::new();

    for i in 0..count {
        let (kind, request) = generator.generate(elevated_rate, invalid_rate);
        let json = serde_json::to_string_pretty(&request)?;

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample {} request {}:\n{}", kind, i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
