/// One historical cost record for a patient with a known condition.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CostObservation {
    /// Patient age in years.
    pub age: f64,
    /// Condition display name, e.g. `ACUTE KIDNEY INJURY`.
    pub condition: String,
    /// Annual preventive management cost.
    pub proactive_cost: f64,
    /// Annual emergency treatment cost.
    pub reactive_cost: f64,
}
