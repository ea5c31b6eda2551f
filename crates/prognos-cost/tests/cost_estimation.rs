//! End-to-end cost model behaviour on seeded synthetic cost records.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tempfile::TempDir;

use prognos_chain::{RiskTier, StageResult, StratificationResult};
use prognos_cost::{CostError, CostModel, CostModelConfig, CostObservation};
use prognos_forest::{ForestError, MaxFeatures, RandomForestConfig};

const CONDITIONS: [(&str, f64, f64); 3] = [
    ("ACUTE HEART FAILURE", 4000.0, 30000.0),
    ("ACUTE KIDNEY INJURY", 3000.0, 32000.0),
    ("COPD EXACERBATION", 2500.0, 19000.0),
];

/// Costs grow 1.5% per year over 45, plus uniform noise.
fn observations(n: usize) -> Vec<CostObservation> {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    (0..n)
        .map(|i| {
            let (condition, proactive, reactive) = CONDITIONS[i % CONDITIONS.len()];
            let age = f64::from(rng.gen_range(45u8..=90));
            let modifier = 1.0 + (age - 45.0) * 0.015;
            CostObservation {
                age,
                condition: condition.to_string(),
                proactive_cost: proactive * modifier + rng.gen_range(-300.0..300.0),
                reactive_cost: reactive * modifier + rng.gen_range(-2000.0..2000.0),
            }
        })
        .collect()
}

fn config() -> CostModelConfig {
    CostModelConfig::new(
        RandomForestConfig::new(40)
            .unwrap()
            .with_max_features(MaxFeatures::All),
    )
}

fn stratification(age: Option<f64>) -> StratificationResult {
    let stage = |condition: &str, risk_score: f64| StageResult {
        condition: condition.to_string(),
        risk_score,
        risk_tier: RiskTier::Minimal,
        key_risk_factors: vec![],
    };
    StratificationResult {
        patient_id: "PATIENT-HIGH-003".to_string(),
        age,
        overall_risk_score: 0.219,
        present_risk_condition: "ACUTE KIDNEY INJURY".to_string(),
        predicted_outcomes: vec![
            stage("ACUTE HEART FAILURE", 0.13),
            stage("ACUTE KIDNEY INJURY", 0.219),
            stage("COPD EXACERBATION", 0.036),
        ],
    }
}

#[test]
fn estimates_every_distinct_condition_primary_first() {
    let (model, _) = CostModel::train(&observations(600), &config()).unwrap();
    let roi = model.estimate(&stratification(Some(72.0))).unwrap();

    let names: Vec<&str> = roi.predicted_costs.iter().map(|c| c.condition.as_str()).collect();
    assert_eq!(
        names,
        vec!["ACUTE KIDNEY INJURY", "ACUTE HEART FAILURE", "COPD EXACERBATION"]
    );
    assert_eq!(roi.patient_id, "PATIENT-HIGH-003");
    for cost in &roi.predicted_costs {
        assert!(cost.predicted_reactive_cost > cost.predicted_proactive_cost);
        let savings = cost.predicted_reactive_cost - cost.predicted_proactive_cost;
        assert!((cost.potential_savings - savings).abs() < 1e-9);
    }
}

#[test]
fn missing_age_defaults_to_65() {
    let (model, _) = CostModel::train(&observations(300), &config()).unwrap();
    let roi = model.estimate(&stratification(None)).unwrap();
    assert!((roi.age_used_for_prediction - 65.0).abs() < f64::EPSILON);
    let explicit = model.predict(65.0, "ACUTE KIDNEY INJURY").unwrap();
    assert_eq!(roi.predicted_costs[0], explicit);
}

#[test]
fn older_patients_cost_more() {
    let (model, _) = CostModel::train(&observations(900), &config()).unwrap();
    let young = model.predict(48.0, "COPD EXACERBATION").unwrap();
    let old = model.predict(88.0, "COPD EXACERBATION").unwrap();
    assert!(old.predicted_reactive_cost > young.predicted_reactive_cost);
}

#[test]
fn unknown_condition_gets_baseline_not_error() {
    let (model, _) = CostModel::train(&observations(300), &config()).unwrap();
    let estimate = model.predict(70.0, "GOUT").unwrap();
    assert!(estimate.predicted_proactive_cost.is_finite());
    assert_eq!(estimate.condition, "GOUT");
}

#[test]
fn holdout_report_is_informative() {
    let (_, report) = CostModel::train(&observations(600), &config()).unwrap();
    let holdout = report.holdout.unwrap();
    assert_eq!(holdout.n_test, 120);
    assert!(holdout.reactive.r2 > 0.5, "r2 = {}", holdout.reactive.r2);
    assert_eq!(report.columns[0], "age");
    assert_eq!(report.columns.len(), 4);
}

#[test]
fn saved_model_reloads() {
    let (model, _) = CostModel::train(&observations(200), &config()).unwrap();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("demo_cost.bin");
    model.save(&path).unwrap();
    let loaded = CostModel::load(&path).unwrap();
    let a = model.estimate(&stratification(Some(80.0))).unwrap();
    let b = loaded.estimate(&stratification(Some(80.0))).unwrap();
    assert_eq!(a, b);
}

#[test]
fn damaged_regressor_rejected_at_load() {
    let (model, _) = CostModel::train(&observations(60), &config()).unwrap();
    let mut json = serde_json::to_value(&model).unwrap();
    json["reactive"]["trees"] = serde_json::json!([]);
    let damaged: CostModel = serde_json::from_value(json).unwrap();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("damaged_cost.bin");
    damaged.save(&path).unwrap();
    let err = CostModel::load(&path).unwrap_err();
    assert!(
        matches!(
            err,
            CostError::InvalidModel {
                regime: "reactive",
                source: ForestError::MalformedModel { .. },
            }
        ),
        "{err:?}"
    );
}

#[test]
fn classifier_in_place_of_regressor_rejected_at_load() {
    let (model, _) = CostModel::train(&observations(60), &config()).unwrap();
    let mut json = serde_json::to_value(&model).unwrap();
    json["proactive"]["task"] = serde_json::json!({ "Classifier": { "n_classes": 2 } });
    let damaged: CostModel = serde_json::from_value(json).unwrap();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mislabelled_cost.bin");
    damaged.save(&path).unwrap();
    assert!(matches!(
        CostModel::load(&path),
        Err(CostError::InvalidModel { regime: "proactive", .. })
    ));
}

#[test]
fn invalid_training_data_rejected() {
    assert!(matches!(
        CostModel::train(&[], &config()),
        Err(CostError::EmptyObservations)
    ));
    let mut bad = observations(10);
    bad[3].reactive_cost = f64::NAN;
    assert!(matches!(
        CostModel::train(&bad, &config()),
        Err(CostError::NonFiniteObservation { index: 3, field: "reactive_cost" })
    ));
    let err = CostModel::train(
        &observations(10),
        &config().with_holdout_fraction(Some(0.9)),
    )
    .unwrap_err();
    assert!(matches!(err, CostError::InvalidHoldoutFraction { .. }));
}
