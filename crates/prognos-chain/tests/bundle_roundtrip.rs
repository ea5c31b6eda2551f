//! Train a chain on synthetic claims data, persist it, and serve it.

use std::collections::BTreeMap;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tempfile::TempDir;

use prognos_chain::{
    ChainArtifact, ChainConfig, ChainError, ConditionTarget, FeatureSchema, LabelColumn,
    ModelBundle, train_chain,
};
use prognos_forest::{ForestError, RandomForest, RandomForestConfig};

/// 300 beneficiaries. Heart failure tracks age and chronic conditions; kidney
/// injury mostly follows heart failure plus diabetes.
fn synthetic() -> (FeatureSchema, Vec<Vec<f64>>, Vec<LabelColumn>) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut rows = Vec::new();
    let mut hf = Vec::new();
    let mut aki = Vec::new();
    for _ in 0..300 {
        let age = rng.gen_range(40.0..95.0);
        let chronic = f64::from(rng.gen_range(0u8..5));
        let diabetic = f64::from(u8::from(rng.gen_bool(0.35)));
        let heart = usize::from(age / 20.0 + chronic > 6.0);
        let kidney = usize::from(heart == 1 && diabetic > 0.0);
        rows.push(vec![age, chronic, diabetic, rng.r#gen::<f64>()]);
        hf.push(heart);
        aki.push(kidney);
    }
    let schema = FeatureSchema::new(vec![
        "Age".into(),
        "CHRONIC_COUNT".into(),
        "SP_DIABETES".into(),
        "NOISE".into(),
    ])
    .unwrap();
    let targets = vec![
        LabelColumn {
            target: ConditionTarget::new("HAD_HEART_FAILURE_IN_2010").unwrap(),
            labels: hf,
        },
        LabelColumn {
            target: ConditionTarget::new("HAD_ACUTE_KIDNEY_INJURY_IN_2010").unwrap(),
            labels: aki,
        },
    ];
    (schema, rows, targets)
}

fn patient(age: f64, chronic: f64, diabetic: f64) -> BTreeMap<String, f64> {
    [("Age", age), ("CHRONIC_COUNT", chronic), ("SP_DIABETES", diabetic)]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

#[test]
fn trained_bundle_survives_reload() {
    let (schema, rows, targets) = synthetic();
    let config = RandomForestConfig::new(30).unwrap().with_seed(5);
    let trained = train_chain(&schema, &rows, &targets, &config).unwrap();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("demo_chain.bin");
    trained.artifact.save(&path).unwrap();

    let in_memory = ModelBundle::from_artifact(trained.artifact, ChainConfig::new()).unwrap();
    let reloaded = ModelBundle::load(&path, ChainConfig::new()).unwrap();

    let sick = patient(88.0, 4.0, 1.0);
    let a = in_memory.stratify("B-1", Some(88.0), &sick).unwrap();
    let b = reloaded.stratify("B-1", Some(88.0), &sick).unwrap();
    assert_eq!(a, b);

    assert_eq!(b.predicted_outcomes[0].condition, "HEART FAILURE");
    assert_eq!(b.predicted_outcomes[1].condition, "ACUTE KIDNEY INJURY");
    assert!(b.predicted_outcomes[0].risk_score > 0.5);
    assert_eq!(b.predicted_outcomes[0].key_risk_factors.len(), 3);
    for outcome in &b.predicted_outcomes {
        assert!((0.0..=1.0).contains(&outcome.risk_score));
    }
}

#[test]
fn healthy_patient_scores_low() {
    let (schema, rows, targets) = synthetic();
    let config = RandomForestConfig::new(30).unwrap();
    let trained = train_chain(&schema, &rows, &targets, &config).unwrap();
    let bundle = ModelBundle::from_artifact(trained.artifact, ChainConfig::new()).unwrap();
    let result = bundle.stratify("B-2", Some(45.0), &patient(45.0, 0.0, 0.0)).unwrap();
    assert!(result.overall_risk_score < 0.5, "{}", result.overall_risk_score);
}

#[test]
fn bare_forest_file_is_not_a_chain() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("forest.bin");
    let forest: RandomForest = RandomForestConfig::new(2)
        .unwrap()
        .fit_classifier(&[vec![0.0], vec![1.0]], &[0, 1], &["x".to_string()])
        .unwrap()
        .into_forest();
    forest.save(&path).unwrap();

    let err = ModelBundle::load(&path, ChainConfig::new()).unwrap_err();
    assert!(matches!(err, ChainError::Artifact { .. }));
}

#[test]
fn missing_bundle_fails_at_load() {
    let dir = TempDir::new().unwrap();
    let err = ModelBundle::load(dir.path().join("absent.bin"), ChainConfig::new()).unwrap_err();
    assert!(matches!(err, ChainError::Artifact { .. }));
}

/// Train a small chain and rewrite its first stage forest as JSON.
fn damaged_artifact(edit: impl FnOnce(&mut serde_json::Value)) -> ChainArtifact {
    let (schema, rows, targets) = synthetic();
    let config = RandomForestConfig::new(5).unwrap().with_seed(9);
    let trained = train_chain(&schema, &rows, &targets, &config).unwrap();
    let mut json = serde_json::to_value(&trained.artifact).unwrap();
    edit(&mut json["stages"][0]["forest"]);
    serde_json::from_value(json).unwrap()
}

fn assert_rejected_at_construction(artifact: ChainArtifact) {
    let err = ModelBundle::from_artifact(artifact, ChainConfig::new()).unwrap_err();
    assert!(
        matches!(
            err,
            ChainError::InvalidStageModel {
                ref target,
                source: ForestError::MalformedModel { .. },
            } if target == "HAD_HEART_FAILURE_IN_2010"
        ),
        "{err:?}"
    );
}

#[test]
fn forest_without_trees_fails_at_construction() {
    assert_rejected_at_construction(damaged_artifact(|forest| {
        forest["trees"] = serde_json::json!([]);
    }));
}

#[test]
fn split_on_missing_feature_fails_at_construction() {
    assert_rejected_at_construction(damaged_artifact(|forest| {
        forest["trees"][0]["nodes"][0]["Split"]["feature"] = serde_json::json!(7);
    }));
}

#[test]
fn feature_name_mismatch_fails_at_construction() {
    assert_rejected_at_construction(damaged_artifact(|forest| {
        forest["feature_names"].as_array_mut().unwrap().pop();
    }));
}

#[test]
fn damaged_artifact_on_disk_fails_at_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("damaged_chain.bin");
    damaged_artifact(|forest| {
        forest["trees"][0]["nodes"][0]["Split"]["right"] = serde_json::json!(100_000);
    })
    .save(&path)
    .unwrap();

    let err = ModelBundle::load(&path, ChainConfig::new()).unwrap_err();
    assert!(matches!(err, ChainError::InvalidStageModel { .. }), "{err:?}");
}
