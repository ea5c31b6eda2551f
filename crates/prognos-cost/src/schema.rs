//! Feature encoding for the cost regressors.

use std::collections::BTreeSet;

use crate::observation::CostObservation;

/// Name of the age column.
pub const AGE_COLUMN: &str = "age";
/// Prefix of the one-hot condition columns.
pub const CONDITION_PREFIX: &str = "condition_";

/// `age` followed by one indicator column per known condition, sorted by name.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CostSchema {
    conditions: Vec<String>,
}

impl CostSchema {
    /// Collect the distinct conditions seen in training.
    #[must_use]
    pub fn from_observations(observations: &[CostObservation]) -> Self {
        let conditions: BTreeSet<&str> = observations.iter().map(|o| o.condition.as_str()).collect();
        Self {
            conditions: conditions.into_iter().map(str::to_string).collect(),
        }
    }

    /// Return the known conditions in column order.
    #[must_use]
    pub fn conditions(&self) -> &[String] {
        &self.conditions
    }

    /// Return the column names: `age`, then `condition_<NAME>` per condition.
    #[must_use]
    pub fn columns(&self) -> Vec<String> {
        std::iter::once(AGE_COLUMN.to_string())
            .chain(self.conditions.iter().map(|c| format!("{CONDITION_PREFIX}{c}")))
            .collect()
    }

    /// Encode one `(age, condition)` pair. An unknown condition sets no
    /// indicator, which yields the model's baseline for that age.
    #[must_use]
    pub fn encode(&self, age: f64, condition: &str) -> Vec<f64> {
        std::iter::once(age)
            .chain(
                self.conditions
                    .iter()
                    .map(|c| if c == condition { 1.0 } else { 0.0 }),
            )
            .collect()
    }

    /// Return `true` if `condition` was seen in training.
    #[must_use]
    pub fn knows(&self, condition: &str) -> bool {
        self.conditions.binary_search_by(|c| c.as_str().cmp(condition)).is_ok()
    }
}
