//! End-to-end assessment: raw form values to verdict

use crate::assembler::{FeatureAssembler, ModelFeatureVector};
use crate::config::AppConfig;
use crate::decision::{Decision, DecisionPolicy};
use crate::encoder::{encode_input, EncodedFeatureMap};
use crate::error::Result;
use crate::models::ScoringEngine;
use crate::types::{Assessment, AssessmentRequest, RawInput};
use tracing::debug;

/// Owns the loaded model and runs every request through
/// encode, assemble, score and decide.
#[derive(Debug)]
pub struct RiskPipeline {
    assembler: FeatureAssembler,
    engine: ScoringEngine,
    policy: DecisionPolicy,
}

impl RiskPipeline {
    pub fn new(engine: ScoringEngine, policy: DecisionPolicy) -> Self {
        Self {
            assembler: FeatureAssembler::new(),
            engine,
            policy,
        }
    }

    /// Load the configured model and decision threshold.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let engine = ScoringEngine::load(
            &config.model.path,
            config.model.resolved_format(),
            config.model.onnx_threads,
        )?;
        let policy = DecisionPolicy::new(config.decision.threshold)?;
        Ok(Self::new(engine, policy))
    }

    pub fn policy(&self) -> &DecisionPolicy {
        &self.policy
    }

    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    /// Encode and assemble without scoring.
    pub fn prepare(&self, input: &RawInput) -> Result<(EncodedFeatureMap, ModelFeatureVector)> {
        let encoded = encode_input(input)?;
        let vector = self.assembler.assemble(&encoded);

        debug!(
            dropped = ?self.assembler.dropped_columns(&encoded),
            "Feature vector assembled"
        );

        Ok((encoded, vector))
    }

    /// Score raw input and apply the threshold.
    pub fn evaluate(&self, input: &RawInput) -> Result<Decision> {
        let (_, vector) = self.prepare(input)?;
        let probability = self.engine.predict(&vector)?;
        Ok(self.policy.decide(probability))
    }

    /// Full assessment for one request.
    pub fn assess(&self, request: &AssessmentRequest) -> Result<Assessment> {
        let (encoded, vector) = self.prepare(&request.fields)?;
        let probability = self.engine.predict(&vector)?;
        let decision = self.policy.decide(probability);

        debug!(
            request_id = %request.request_id,
            probability = probability,
            verdict = %decision.verdict,
            "Assessment complete"
        );

        Ok(
            Assessment::new(request.request_id.clone(), decision, self.policy.threshold())
                .with_features(encoded),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::{FEATURE_COUNT, MODEL_COLUMNS};
    use crate::decision::Verdict;
    use crate::error::RiskError;
    use crate::models::RiskModel;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Model scoring by Age alone, counting how often it was called
    struct AgeModel {
        calls: Arc<AtomicUsize>,
    }

    impl RiskModel for AgeModel {
        fn name(&self) -> &str {
            "age"
        }

        fn num_features(&self) -> Option<usize> {
            Some(FEATURE_COUNT)
        }

        fn feature_names(&self) -> Option<&[String]> {
            None
        }

        fn predict_proba(&self, features: &[f32]) -> Result<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(features[0] as f64 / 100.0)
        }
    }

    fn pipeline() -> (RiskPipeline, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = ScoringEngine::from_model(Box::new(AgeModel {
            calls: calls.clone(),
        }))
        .unwrap();
        (RiskPipeline::new(engine, DecisionPolicy::default()), calls)
    }

    #[test]
    fn test_assess_scores_and_decides() {
        let (pipeline, _) = pipeline();
        let request = AssessmentRequest::new(RawInput::with_form_defaults().with("Age", 80));

        let assessment = pipeline.assess(&request).unwrap();
        assert!((assessment.probability - 0.8).abs() < 1e-9);
        assert_eq!(assessment.verdict, Verdict::Likely);
        assert_eq!(assessment.threshold, 0.6);
        assert_eq!(assessment.request_id, request.request_id);
        assert_eq!(assessment.features.get("Marital Status"), Some(0.0));
    }

    #[test]
    fn test_boundary_probability_is_unlikely() {
        let (pipeline, _) = pipeline();
        let decision = pipeline
            .evaluate(&RawInput::with_form_defaults().with("Age", 60))
            .unwrap();
        assert_eq!(decision.verdict, Verdict::Unlikely);
    }

    #[test]
    fn test_invalid_input_never_reaches_model() {
        let (pipeline, calls) = pipeline();
        let input = RawInput::with_form_defaults().with("Sleep Quality", "Excellent");

        let err = pipeline.evaluate(&input).unwrap_err();
        assert!(matches!(err, RiskError::InvalidInput { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_prepare_vector_follows_schema() {
        let (pipeline, _) = pipeline();
        let (encoded, vector) = pipeline.prepare(&RawInput::with_form_defaults()).unwrap();

        assert_eq!(encoded.len(), 28);
        assert_eq!(vector.columns(), &MODEL_COLUMNS);
        assert_eq!(vector.get("Gender_Male"), Some(1.0));
    }
}
