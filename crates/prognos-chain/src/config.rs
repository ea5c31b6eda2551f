//! Inference-time policy for a classifier chain.

use crate::error::ChainError;
use crate::tier::TierThresholds;

/// Number of attributed features reported per stage by default.
pub const DEFAULT_TOP_K: usize = 3;

/// Reporting policy applied to every stage of a chain.
///
/// # Defaults
///
/// | Parameter    | Default              |
/// |--------------|----------------------|
/// | `top_k`      | 3                    |
/// | `thresholds` | 0.25 / 0.50 / 0.75   |
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainConfig {
    pub(crate) top_k: usize,
    pub(crate) thresholds: TierThresholds,
}

impl ChainConfig {
    /// Create a config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            thresholds: TierThresholds::default(),
        }
    }

    /// Set how many top attributed features each stage reports.
    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the tier thresholds.
    #[must_use]
    pub fn with_thresholds(mut self, thresholds: TierThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Return the number of reported risk factors per stage.
    #[must_use]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Return the tier thresholds.
    #[must_use]
    pub fn thresholds(&self) -> TierThresholds {
        self.thresholds
    }

    pub(crate) fn validate(&self) -> Result<(), ChainError> {
        if self.top_k == 0 {
            return Err(ChainError::InvalidTopK { top_k: self.top_k });
        }
        Ok(())
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self::new()
    }
}
