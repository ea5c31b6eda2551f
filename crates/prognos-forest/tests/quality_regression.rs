//! Quality regression tests for prognos-forest.
//!
//! These guard against algorithmic changes that degrade binary risk
//! classification or cost regression on deterministic synthetic data.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use prognos_forest::{MaxFeatures, RandomForestConfig, SplitMethod};

/// 400 patients, 8 features. The label is 1 when `age / 10 + chronic * 2`
/// exceeds 10; the remaining five columns are noise.
fn make_risk_data() -> (Vec<Vec<f64>>, Vec<usize>, Vec<String>) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut features = Vec::with_capacity(400);
    let mut labels = Vec::with_capacity(400);
    for _ in 0..400 {
        let age = rng.gen_range(30.0..95.0);
        let chronic = f64::from(rng.gen_range(0u8..4));
        let smoker = f64::from(u8::from(rng.gen_bool(0.3)));
        let mut row = vec![age, chronic, smoker];
        row.extend((0..5).map(|_| rng.r#gen::<f64>()));
        labels.push(usize::from(age / 10.0 + chronic * 2.0 > 10.0));
        features.push(row);
    }
    let mut names: Vec<String> = ["Age", "CHRONIC_COUNT", "SMOKER"]
        .iter()
        .map(|s| (*s).to_string())
        .collect();
    names.extend((0..5).map(|i| format!("noise{i}")));
    (features, labels, names)
}

fn holdout_accuracy(method: SplitMethod) -> f64 {
    let (features, labels, names) = make_risk_data();
    let (train_x, test_x) = features.split_at(300);
    let (train_y, test_y) = labels.split_at(300);
    let forest = RandomForestConfig::new(60)
        .unwrap()
        .with_split_method(method)
        .with_seed(7)
        .fit_classifier(train_x, train_y, &names)
        .unwrap()
        .into_forest();
    let correct = test_x
        .iter()
        .zip(test_y)
        .filter(|&(x, &y)| forest.predict(x).unwrap() == y)
        .count();
    correct as f64 / test_y.len() as f64
}

#[test]
fn holdout_accuracy_above_threshold() {
    let exact = holdout_accuracy(SplitMethod::Exact);
    assert!(exact > 0.85, "exact holdout accuracy {exact} <= 0.85");
    let extra = holdout_accuracy(SplitMethod::ExtraTrees);
    assert!(extra > 0.80, "extra-trees holdout accuracy {extra} <= 0.80");
}

#[test]
fn top_features_are_informative() {
    let (features, labels, names) = make_risk_data();
    let result = RandomForestConfig::new(80)
        .unwrap()
        .fit_classifier(&features, &labels, &names)
        .unwrap();
    let top2: Vec<&str> = result
        .importances()
        .iter()
        .take(2)
        .map(|f| f.name.as_str())
        .collect();
    assert!(top2.contains(&"Age"), "top-2: {top2:?}");
    assert!(top2.contains(&"CHRONIC_COUNT"), "top-2: {top2:?}");
}

#[test]
fn contributions_reconstruct_every_probability() {
    let (features, labels, names) = make_risk_data();
    let forest = RandomForestConfig::new(25)
        .unwrap()
        .fit_classifier(&features, &labels, &names)
        .unwrap()
        .into_forest();
    for sample in features.iter().take(50) {
        let contrib = forest.contributions(sample, 1).unwrap();
        let p = forest.positive_probability(sample).unwrap();
        assert!((contrib.total() - p).abs() < 1e-9);
        assert!((0.0..=1.0).contains(&p));
    }
}

#[test]
fn cost_regression_tracks_age_trend() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let mut features = Vec::new();
    let mut costs = Vec::new();
    for _ in 0..300 {
        let age = rng.gen_range(40.0..90.0);
        let diabetic = f64::from(u8::from(rng.gen_bool(0.5)));
        features.push(vec![age, diabetic]);
        costs.push(age * 100.0 + diabetic * 3000.0 + rng.gen_range(-200.0..200.0));
    }
    let names = vec!["age".to_string(), "condition_Diabetes".to_string()];
    let forest = RandomForestConfig::new(50)
        .unwrap()
        .with_max_features(MaxFeatures::All)
        .fit_regressor(&features, &costs, &names)
        .unwrap()
        .into_forest();

    let young = forest.predict_value(&[45.0, 0.0]).unwrap();
    let old = forest.predict_value(&[85.0, 0.0]).unwrap();
    let old_diabetic = forest.predict_value(&[85.0, 1.0]).unwrap();
    assert!(old > young + 2500.0, "young {young}, old {old}");
    assert!(old_diabetic > old + 1500.0, "old {old}, diabetic {old_diabetic}");
}

#[test]
fn deterministic_predictions() {
    let (features, labels, names) = make_risk_data();
    let config = RandomForestConfig::new(40).unwrap().with_seed(42);
    let a = config.fit_classifier(&features, &labels, &names).unwrap();
    let b = config.fit_classifier(&features, &labels, &names).unwrap();
    let pa = a.forest().predict_proba_batch(&features).unwrap();
    let pb = b.forest().predict_proba_batch(&features).unwrap();
    for (x, y) in pa.iter().zip(&pb) {
        assert_eq!(x.as_slice(), y.as_slice());
    }
}
