//! Cost estimates reported per patient.

use serde::Serializer;

/// Age assumed when a stratification result carries none.
pub const DEFAULT_AGE: f64 = 65.0;

/// Decimal places kept for currency amounts in serialized output.
const COST_DECIMALS: i32 = 2;

fn round_cost<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    let scale = 10f64.powi(COST_DECIMALS);
    serializer.serialize_f64((value * scale).round() / scale)
}

/// Predicted costs for one condition.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CostEstimate {
    /// Condition display name.
    pub condition: String,
    /// Predicted preventive management cost.
    #[serde(serialize_with = "round_cost")]
    pub predicted_proactive_cost: f64,
    /// Predicted emergency treatment cost.
    #[serde(serialize_with = "round_cost")]
    pub predicted_reactive_cost: f64,
    /// `predicted_reactive_cost - predicted_proactive_cost`.
    #[serde(serialize_with = "round_cost")]
    pub potential_savings: f64,
}

/// Cost estimates for every condition in one stratification result.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RoiPrediction {
    /// Patient identifier copied from the stratification result.
    #[serde(rename = "patientId")]
    pub patient_id: String,
    /// Age fed to the cost regressors.
    pub age_used_for_prediction: f64,
    /// One estimate per distinct condition, primary condition first.
    #[serde(rename = "predictedCosts")]
    pub predicted_costs: Vec<CostEstimate>,
}

impl RoiPrediction {
    /// Sum of potential savings over every condition.
    #[must_use]
    pub fn total_potential_savings(&self) -> f64 {
        self.predicted_costs.iter().map(|c| c.potential_savings).sum()
    }
}
