//! Alzheimer's Risk Scoring Worker - Main Entry Point
//!
//! Consumes assessment requests from NATS, scores them with the loaded tree
//! ensemble and publishes a verdict or a rejection for each one.

use alzheimer_risk::{
    config::{AppConfig, LoggingConfig},
    consumer::{decode_request, request_id_hint, AssessmentConsumer},
    metrics::{MetricsReporter, PipelineMetrics},
    pipeline::RiskPipeline,
    producer::ResultProducer,
    types::{AssessmentOutcome, Rejection},
    RiskError,
};
use anyhow::{Context, Result};
use futures::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Request id used when the payload does not carry a readable one
const UNKNOWN_REQUEST_ID: &str = "unknown";

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("alzheimer_risk={}", logging.level).parse()?);

    if logging.format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("Starting Alzheimer's Risk Scoring Worker");
    info!(
        model = %config.model.path.display(),
        format = ?config.model.resolved_format(),
        threshold = config.decision.threshold,
        "Configuration loaded"
    );

    // The worker cannot serve without a model
    let pipeline = Arc::new(
        RiskPipeline::from_config(&config).context("Failed to initialize scoring pipeline")?,
    );
    info!(
        model = %pipeline.engine().model_name(),
        threshold = pipeline.policy().threshold(),
        "Scoring pipeline ready"
    );

    let metrics = Arc::new(PipelineMetrics::new());

    let client = async_nats::connect(&config.nats.url)
        .await
        .with_context(|| format!("Failed to connect to NATS at {}", config.nats.url))?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = AssessmentConsumer::new(client.clone(), &config.nats.request_subject);
    let producer = Arc::new(ResultProducer::new(
        client.clone(),
        &config.nats.result_subject,
    ));

    let num_workers = config.pipeline.workers;
    info!(
        "Starting request processing loop with {} parallel workers",
        num_workers
    );
    info!("Listening on subject: {}", consumer.subject());
    info!("Publishing results to: {}", producer.subject());

    // Semaphore to limit concurrent processing
    let semaphore = Arc::new(Semaphore::new(num_workers));
    let processed_count = Arc::new(AtomicU64::new(0));

    let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
    tokio::spawn(reporter.start());

    let mut subscription = consumer.subscribe().await?;

    while let Some(message) = subscription.next().await {
        let permit = semaphore.clone().acquire_owned().await?;

        let pipeline = pipeline.clone();
        let producer = producer.clone();
        let metrics = metrics.clone();
        let processed_count = processed_count.clone();

        tokio::spawn(async move {
            let start_time = Instant::now();

            let outcome = match decode_request(&message.payload) {
                Ok(request) => match pipeline.assess(&request) {
                    Ok(assessment) => {
                        let processing_time = start_time.elapsed();
                        metrics.record_assessment(
                            processing_time,
                            assessment.probability,
                            assessment.verdict,
                        );
                        debug!(
                            request_id = %assessment.request_id,
                            probability = assessment.probability,
                            verdict = %assessment.verdict,
                            processing_time_us = processing_time.as_micros(),
                            "Request scored"
                        );
                        AssessmentOutcome::Scored(assessment)
                    }
                    Err(e @ RiskError::InvalidInput { .. }) => {
                        metrics.record_rejection();
                        warn!(request_id = %request.request_id, error = %e, "Rejected invalid input");
                        AssessmentOutcome::Rejected(Rejection::new(request.request_id, e))
                    }
                    Err(e) => {
                        metrics.record_failure();
                        error!(request_id = %request.request_id, error = %e, "Inference failed");
                        AssessmentOutcome::Rejected(Rejection::new(request.request_id, e))
                    }
                },
                Err(e) => {
                    metrics.record_rejection();
                    let request_id = request_id_hint(&message.payload)
                        .unwrap_or_else(|| UNKNOWN_REQUEST_ID.to_string());
                    warn!(request_id = %request_id, error = %e, "Failed to deserialize assessment request");
                    AssessmentOutcome::Rejected(Rejection::new(request_id, e))
                }
            };

            if let Err(e) = producer.publish(&outcome).await {
                error!(
                    request_id = %outcome.request_id(),
                    error = %e,
                    "Failed to publish result"
                );
            }

            if let Some(reply) = message.reply {
                if let Err(e) = producer.respond(reply, &outcome).await {
                    error!(
                        request_id = %outcome.request_id(),
                        error = %e,
                        "Failed to answer request"
                    );
                }
            }

            let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;
            if count % 100 == 0 {
                let processing_stats = metrics.get_processing_stats();
                info!(
                    processed = count,
                    throughput = format!("{:.1} req/s", metrics.get_throughput()),
                    avg_latency_us = processing_stats.mean_us,
                    "Processing milestone"
                );
            }

            drop(permit);
        });
    }

    info!("Worker shutting down...");
    metrics.print_summary();

    Ok(())
}
