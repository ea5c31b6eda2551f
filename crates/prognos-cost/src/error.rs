use prognos_forest::ForestError;

/// Errors from cost model training, estimation, and persistence.
#[derive(Debug, thiserror::Error)]
pub enum CostError {
    /// Returned when training receives no observations.
    #[error("cost training data has zero observations")]
    EmptyObservations,

    /// Returned when an observation holds a NaN or infinite number.
    #[error("observation {index} has non-finite {field}")]
    NonFiniteObservation {
        /// Zero-based observation index.
        index: usize,
        /// Name of the offending field.
        field: &'static str,
    },

    /// Returned when an observation has a blank condition.
    #[error("observation {index} has an empty condition")]
    EmptyCondition {
        /// Zero-based observation index.
        index: usize,
    },

    /// Returned when the holdout fraction leaves no rows to train or evaluate on.
    #[error("holdout fraction must be in (0.0, 0.5], got {fraction}")]
    InvalidHoldoutFraction {
        /// The invalid fraction provided.
        fraction: f64,
    },

    /// Returned when fitting one of the cost regressors fails.
    #[error("failed to train the {regime} cost model")]
    Training {
        /// Which regressor failed ("proactive" or "reactive").
        regime: &'static str,
        /// The underlying forest error.
        source: ForestError,
    },

    /// Returned when a cost regressor cannot score an input.
    #[error("cost prediction for {condition:?} failed")]
    Prediction {
        /// Condition being priced.
        condition: String,
        /// The underlying forest error.
        source: ForestError,
    },

    /// Returned when a loaded cost regressor cannot serve predictions.
    #[error("stored {regime} cost model is not usable")]
    InvalidModel {
        /// Which regressor is unusable ("proactive" or "reactive").
        regime: &'static str,
        /// The underlying forest error.
        source: ForestError,
    },

    /// Returned when reading or writing the cost model artifact fails.
    #[error("cost model artifact error")]
    Artifact {
        /// The underlying forest artifact error.
        #[from]
        source: ForestError,
    },
}
