use std::fmt;

use crate::error::ChainError;

/// Ordinal risk bucket for one predicted probability.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub enum RiskTier {
    /// Below the low threshold.
    #[serde(rename = "Tier 1: Minimal Risk")]
    Minimal,
    /// At or above the low threshold.
    #[serde(rename = "Tier 2: Low Risk")]
    Low,
    /// At or above the moderate threshold.
    #[serde(rename = "Tier 3: Moderate Risk")]
    Moderate,
    /// At or above the high threshold.
    #[serde(rename = "Tier 4: High Risk")]
    High,
}

impl RiskTier {
    /// Return the reporting label, e.g. `Tier 3: Moderate Risk`.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            RiskTier::Minimal => "Tier 1: Minimal Risk",
            RiskTier::Low => "Tier 2: Low Risk",
            RiskTier::Moderate => "Tier 3: Moderate Risk",
            RiskTier::High => "Tier 4: High Risk",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Inclusive lower bounds of the Low, Moderate, and High tiers.
///
/// # Defaults
///
/// | Tier     | Lower bound |
/// |----------|-------------|
/// | Low      | 0.25        |
/// | Moderate | 0.50        |
/// | High     | 0.75        |
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct TierThresholds {
    low: f64,
    moderate: f64,
    high: f64,
}

impl TierThresholds {
    /// Create thresholds.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::InvalidThresholds`] unless
    /// `0 <= low < moderate < high <= 1`.
    pub fn new(low: f64, moderate: f64, high: f64) -> Result<Self, ChainError> {
        let ordered = 0.0 <= low && low < moderate && moderate < high && high <= 1.0;
        if !ordered {
            return Err(ChainError::InvalidThresholds {
                low,
                moderate,
                high,
            });
        }
        Ok(Self {
            low,
            moderate,
            high,
        })
    }

    /// Map a probability to its tier, checking the highest bound first.
    #[must_use]
    pub fn tier(&self, probability: f64) -> RiskTier {
        if probability >= self.high {
            RiskTier::High
        } else if probability >= self.moderate {
            RiskTier::Moderate
        } else if probability >= self.low {
            RiskTier::Low
        } else {
            RiskTier::Minimal
        }
    }

    /// Lower bound of the Low tier.
    #[must_use]
    pub fn low(&self) -> f64 {
        self.low
    }

    /// Lower bound of the Moderate tier.
    #[must_use]
    pub fn moderate(&self) -> f64 {
        self.moderate
    }

    /// Lower bound of the High tier.
    #[must_use]
    pub fn high(&self) -> f64 {
        self.high
    }
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            low: 0.25,
            moderate: 0.50,
            high: 0.75,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_boundaries_are_inclusive() {
        let t = TierThresholds::default();
        assert_eq!(t.tier(0.0), RiskTier::Minimal);
        assert_eq!(t.tier(0.2499), RiskTier::Minimal);
        assert_eq!(t.tier(0.25), RiskTier::Low);
        assert_eq!(t.tier(0.5), RiskTier::Moderate);
        assert_eq!(t.tier(0.75), RiskTier::High);
        assert_eq!(t.tier(1.0), RiskTier::High);
    }

    #[test]
    fn tier_is_monotone_in_probability() {
        let t = TierThresholds::default();
        let mut previous = RiskTier::Minimal;
        for step in 0..=1000 {
            let tier = t.tier(f64::from(step) / 1000.0);
            assert!(tier >= previous);
            previous = tier;
        }
    }

    #[test]
    fn labels_serialize_verbatim() {
        let json = serde_json::to_string(&RiskTier::Moderate).unwrap();
        assert_eq!(json, "\"Tier 3: Moderate Risk\"");
        assert_eq!(RiskTier::High.to_string(), "Tier 4: High Risk");
    }

    #[test]
    fn unordered_thresholds_rejected() {
        assert!(TierThresholds::new(0.5, 0.5, 0.9).is_err());
        assert!(TierThresholds::new(0.1, 0.4, 1.2).is_err());
        assert!(TierThresholds::new(f64::NAN, 0.4, 0.8).is_err());
        assert!(TierThresholds::new(0.1, 0.4, 0.8).is_ok());
    }
}
