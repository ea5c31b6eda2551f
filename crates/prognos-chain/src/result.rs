//! Per-stage and per-patient stratification results.

use serde::Serializer;

use crate::tier::RiskTier;

/// Decimal places kept for risk scores in serialized output.
const SCORE_DECIMALS: i32 = 3;

fn round_score<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    let scale = 10f64.powi(SCORE_DECIMALS);
    serializer.serialize_f64((value * scale).round() / scale)
}

/// Output of one chain stage.
///
/// `risk_score` keeps full precision in memory and is rounded to three
/// decimals when serialized.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageResult {
    /// Display name of the stage's condition.
    pub condition: String,
    /// Predicted probability in [0, 1].
    #[serde(serialize_with = "round_score")]
    pub risk_score: f64,
    /// Tier of `risk_score`.
    pub risk_tier: RiskTier,
    /// Top attributed feature names, most influential first.
    pub key_risk_factors: Vec<String>,
}

/// Stratification of one patient across every chain stage.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StratificationResult {
    /// Opaque patient identifier.
    pub patient_id: String,
    /// Patient age, when supplied.
    pub age: Option<f64>,
    /// Highest stage probability.
    #[serde(serialize_with = "round_score")]
    pub overall_risk_score: f64,
    /// Condition of the first stage reaching `overall_risk_score`.
    pub present_risk_condition: String,
    /// Every stage result, in chain order.
    pub predicted_outcomes: Vec<StageResult>,
}

impl StratificationResult {
    /// The primary condition followed by every outcome's condition,
    /// deduplicated in first-seen order.
    #[must_use]
    pub fn condition_names(&self) -> Vec<&str> {
        let mut names = vec![self.present_risk_condition.as_str()];
        for outcome in &self.predicted_outcomes {
            if !names.contains(&outcome.condition.as_str()) {
                names.push(&outcome.condition);
            }
        }
        names
    }
}
