use std::fmt;

use crate::error::ChainError;

const LABEL_PREFIX: &str = "HAD_";
const YEAR_MARKER: &str = "_IN_";
const PROPAGATED_SUFFIX: &str = "_prob";

/// A binary outcome label such as `HAD_ACUTE_HEART_FAILURE`.
///
/// Position in the chain decides execution order and which earlier
/// probabilities a stage sees.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConditionTarget {
    label: String,
}

impl ConditionTarget {
    /// Create a target from its label.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::EmptyTargetLabel`] for an empty or blank label.
    pub fn new(label: impl Into<String>) -> Result<Self, ChainError> {
        let label = label.into();
        if label.trim().is_empty() {
            return Err(ChainError::EmptyTargetLabel);
        }
        Ok(Self { label })
    }

    /// Return the raw label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Human-readable condition name.
    ///
    /// Drops the `HAD_` prefix, turns a trailing `_IN_<year>` into a space,
    /// then replaces underscores with spaces and trims:
    /// `HAD_ACUTE_KIDNEY_INJURY_IN_2010` becomes `ACUTE KIDNEY INJURY`.
    #[must_use]
    pub fn display_name(&self) -> String {
        let name = self.label.strip_prefix(LABEL_PREFIX).unwrap_or(&self.label);
        let name = match name.rfind(YEAR_MARKER) {
            Some(idx)
                if name[idx + YEAR_MARKER.len()..]
                    .chars()
                    .all(|c| c.is_ascii_digit())
                    && idx + YEAR_MARKER.len() < name.len() =>
            {
                format!("{} ", &name[..idx])
            }
            _ => name.to_string(),
        };
        name.replace('_', " ").trim().to_string()
    }

    /// Name of the feature carrying this stage's probability into later stages.
    #[must_use]
    pub fn propagated_feature(&self) -> String {
        format!("{}{PROPAGATED_SUFFIX}", self.label)
    }
}

impl TryFrom<String> for ConditionTarget {
    type Error = ChainError;

    fn try_from(label: String) -> Result<Self, Self::Error> {
        Self::new(label)
    }
}

impl From<ConditionTarget> for String {
    fn from(target: ConditionTarget) -> Self {
        target.label
    }
}

impl fmt::Display for ConditionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}
