//! End-to-end scoring against a small XGBoost artifact.
//!
//! The fixture holds two stumps: Age < 60 (-0.5 / 0.8) and
//! Cognitive Test Score < 50 (0.7 / -0.3), base_score 0.5.

use alzheimer_risk::config::AppConfig;
use alzheimer_risk::consumer::decode_request;
use alzheimer_risk::decision::{DecisionPolicy, Verdict};
use alzheimer_risk::models::{ModelFormat, ScoringEngine};
use alzheimer_risk::types::{AssessmentOutcome, AssessmentRequest, RawInput, Rejection};
use alzheimer_risk::{RiskError, RiskPipeline, MODEL_COLUMNS};
use serde_json::Value;
use std::path::PathBuf;

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/risk_stumps.json")
}

fn fixture_json() -> Value {
    let bytes = std::fs::read(fixture_path()).unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn engine() -> ScoringEngine {
    ScoringEngine::load(fixture_path(), ModelFormat::XgboostJson, 1).unwrap()
}

fn pipeline() -> RiskPipeline {
    RiskPipeline::new(engine(), DecisionPolicy::default())
}

fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

fn sample_input() -> RawInput {
    RawInput::new()
        .with("Age", 25)
        .with("Education Level", 0)
        .with("BMI", 22)
        .with("Diabetes", "No")
        .with("Hypertension", "No")
        .with("Cholesterol Level", "Normal")
        .with("Family History of Alzheimer\u{2019}s", "No")
        .with("Cognitive Test Score", 75)
        .with("Depression Level", "Low")
        .with("Sleep Quality", "Good")
        .with("Air Pollution Exposure", "Low")
        .with("Genetic Risk Factor (APOE-\u{3b5}4 allele)", "No")
        .with("Social Engagement Level", "Low")
        .with("Income Level", "Low")
        .with("Stress Levels", "Low")
        .with("Marital Status", "Married")
        .with("Urban vs Rural Living", "Rural")
        .with("Gender", "Female")
        .with("Physical Activity Level", "Inactive")
        .with("Smoking Status", "Never")
        .with("Alcohol Consumption", "Occasionally")
        .with("Dietary Habits", "Healthy")
        .with("Employment Status", "Unemployed")
}

fn write_model(value: &Value) -> tempfile::NamedTempFile {
    let file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    std::fs::write(file.path(), serde_json::to_vec(value).unwrap()).unwrap();
    file
}

#[test]
fn test_reference_sample_is_unlikely() {
    let pipeline = pipeline();
    let request = AssessmentRequest::new(sample_input());

    let assessment = pipeline.assess(&request).unwrap();
    assert!((assessment.probability - sigmoid(-0.8)).abs() < 1e-5);
    assert_eq!(assessment.verdict, Verdict::Unlikely);
    assert_eq!(
        assessment.message,
        "This person is unlikely to have Alzheimer\u{2019}s"
    );
    assert_eq!(assessment.features.get("Marital Status"), Some(1.0));
    assert_eq!(assessment.features.get("Urban vs Rural Living"), Some(0.0));
}

#[test]
fn test_older_low_score_profile_is_likely() {
    let pipeline = pipeline();
    let input = sample_input()
        .with("Age", 80)
        .with("Cognitive Test Score", 20);

    let decision = pipeline.evaluate(&input).unwrap();
    assert!((decision.probability - sigmoid(1.5)).abs() < 1e-5);
    assert_eq!(decision.verdict, Verdict::Likely);
}

#[test]
fn test_reference_vector_reaches_model_in_schema_order() {
    let (_, vector) = pipeline().prepare(&sample_input()).unwrap();

    let expected: Vec<f32> = vec![
        25.0, 0.0, 22.0, 0.0, 0.0, 0.0, 0.0, 75.0, 0.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
        0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0, 1.0,
    ];
    assert_eq!(vector.values(), expected.as_slice());
    assert_eq!(vector.columns(), &MODEL_COLUMNS);
}

#[test]
fn test_scoring_is_deterministic() {
    let pipeline = pipeline();
    let input = sample_input().with("Age", 67);

    let first = pipeline.evaluate(&input).unwrap();
    let second = pipeline.evaluate(&input).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_split_thresholds_are_strict() {
    let pipeline = pipeline();

    // Age 60 takes the right branch, Cognitive 50 takes the right branch
    let at_split = sample_input()
        .with("Age", 60)
        .with("Cognitive Test Score", 50);
    let decision = pipeline.evaluate(&at_split).unwrap();
    assert!((decision.probability - sigmoid(0.5)).abs() < 1e-5);

    let below = sample_input()
        .with("Age", 59)
        .with("Cognitive Test Score", 49);
    let decision = pipeline.evaluate(&below).unwrap();
    assert!((decision.probability - sigmoid(0.2)).abs() < 1e-5);
}

#[test]
fn test_probability_equal_to_threshold_is_unlikely() {
    let input = sample_input().with("Age", 70);
    let probability = pipeline().evaluate(&input).unwrap().probability;

    let at_threshold = RiskPipeline::new(engine(), DecisionPolicy::new(probability).unwrap());
    assert_eq!(at_threshold.evaluate(&input).unwrap().verdict, Verdict::Unlikely);

    let below_threshold =
        RiskPipeline::new(engine(), DecisionPolicy::new(probability - 1e-6).unwrap());
    assert_eq!(below_threshold.evaluate(&input).unwrap().verdict, Verdict::Likely);
}

#[test]
fn test_invalid_inputs_are_rejected() {
    let pipeline = pipeline();

    let out_of_range = sample_input().with("Age", 101);
    let err = pipeline.evaluate(&out_of_range).unwrap_err();
    assert!(matches!(err, RiskError::InvalidInput { ref field, .. } if field == "Age"));

    let unknown_label = sample_input().with("Smoking Status", "Current");
    assert!(matches!(
        pipeline.evaluate(&unknown_label).unwrap_err(),
        RiskError::InvalidInput { .. }
    ));

    let mut missing = sample_input();
    missing.remove("Gender");
    assert!(matches!(
        pipeline.evaluate(&missing).unwrap_err(),
        RiskError::InvalidInput { .. }
    ));
}

#[test]
fn test_fractional_value_is_rejected_on_its_field() {
    let mut fields = serde_json::to_value(sample_input()).unwrap();
    fields["BMI"] = Value::from(22.5);
    let payload = serde_json::json!({ "request_id": "r-9", "fields": fields });

    let request = decode_request(&serde_json::to_vec(&payload).unwrap()).unwrap();
    assert_eq!(request.request_id, "r-9");

    match pipeline().assess(&request).unwrap_err() {
        RiskError::InvalidInput { field, value, .. } => {
            assert_eq!(field, "BMI");
            assert_eq!(value, "22.5");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_rejection_outcome_carries_request_id() {
    let pipeline = pipeline();
    let request = AssessmentRequest::new(sample_input().with("BMI", 9));

    let err = pipeline.assess(&request).unwrap_err();
    assert!(err.is_request_error());

    let outcome = AssessmentOutcome::Rejected(Rejection::new(request.request_id.clone(), err));
    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["status"], "rejected");
    assert_eq!(json["request_id"], request.request_id.as_str());
    assert!(json["error"].as_str().unwrap().contains("BMI"));
}

#[test]
fn test_wrong_feature_count_refuses_to_load() {
    let mut model = fixture_json();
    model["learner"]["learner_model_param"]["num_feature"] = Value::from("25");
    if let Some(names) = model["learner"]["feature_names"].as_array_mut() {
        names.pop();
    }
    let file = write_model(&model);

    let err = ScoringEngine::load(file.path(), ModelFormat::XgboostJson, 1).unwrap_err();
    assert!(matches!(err, RiskError::SchemaMismatch(_)));
}

#[test]
fn test_reordered_columns_refuse_to_load() {
    let mut model = fixture_json();
    if let Some(names) = model["learner"]["feature_names"].as_array_mut() {
        names.swap(15, 16);
    }
    let file = write_model(&model);

    let err = ScoringEngine::load(file.path(), ModelFormat::XgboostJson, 1).unwrap_err();
    assert!(err.to_string().contains("Gender_Male"));
}

#[test]
fn test_missing_or_corrupt_artifact_is_model_load_error() {
    let err = ScoringEngine::load("models/does-not-exist.json", ModelFormat::XgboostJson, 1)
        .unwrap_err();
    assert!(matches!(err, RiskError::ModelLoad { .. }));

    let file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    std::fs::write(file.path(), b"{\"learner\": ").unwrap();
    let err = ScoringEngine::load(file.path(), ModelFormat::XgboostJson, 1).unwrap_err();
    assert!(matches!(err, RiskError::ModelLoad { .. }));
    assert!(!err.is_request_error());
}

#[test]
fn test_pipeline_from_config() {
    let mut config = AppConfig::default();
    config.model.path = fixture_path();
    config.decision.threshold = 0.2;

    let pipeline = RiskPipeline::from_config(&config).unwrap();
    assert_eq!(pipeline.policy().threshold(), 0.2);
    assert_eq!(pipeline.engine().model_name(), "risk_stumps");

    let decision = pipeline.evaluate(&sample_input()).unwrap();
    assert_eq!(decision.verdict, Verdict::Likely);
}
