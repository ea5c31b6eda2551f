use prognos_forest::ForestError;

use crate::estimator::EstimatorError;

/// Errors from chain construction, inference, training, and bundle persistence.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// Returned when a feature schema has no columns.
    #[error("feature schema must contain at least one feature")]
    EmptySchema,

    /// Returned when a feature name appears more than once in a schema.
    #[error("feature {name:?} appears more than once in the schema")]
    DuplicateFeature {
        /// The repeated feature name.
        name: String,
    },

    /// Returned when a feature value kept by schema alignment is NaN or infinite.
    #[error("feature {name:?} has non-finite value {value}")]
    NonFiniteFeature {
        /// Feature name.
        name: String,
        /// The offending value.
        value: f64,
    },

    /// Returned when a target label is empty.
    #[error("condition target label must not be empty")]
    EmptyTargetLabel,

    /// Returned when a chain has no stages, or aggregation receives no results.
    #[error("classifier chain has no stages")]
    EmptyChain,

    /// Returned when two stages share a target label.
    #[error("target {label:?} appears more than once in the chain")]
    DuplicateTarget {
        /// The repeated target label.
        label: String,
    },

    /// Returned when a stage's estimator expects different inputs than the
    /// chain will feed it.
    #[error("stage {stage} ({target}) expects {got:?}, chain provides {expected:?}")]
    StageInputMismatch {
        /// Zero-based stage position.
        stage: usize,
        /// Target label of the stage.
        target: String,
        /// Feature names the chain feeds this stage.
        expected: Vec<String>,
        /// Feature names the estimator declares.
        got: Vec<String>,
    },

    /// Returned when tier thresholds are not strictly increasing inside [0, 1].
    #[error("tier thresholds must satisfy 0 <= low < moderate < high <= 1, got {low}, {moderate}, {high}")]
    InvalidThresholds {
        /// Lower bound of the Low tier.
        low: f64,
        /// Lower bound of the Moderate tier.
        moderate: f64,
        /// Lower bound of the High tier.
        high: f64,
    },

    /// Returned when the number of reported risk factors is zero.
    #[error("top_k must be at least 1, got {top_k}")]
    InvalidTopK {
        /// The invalid top_k value provided.
        top_k: usize,
    },

    /// Returned when a stage reports a probability outside [0, 1] or non-finite.
    #[error("stage {target} returned probability {probability}, expected a value in [0, 1]")]
    ProbabilityOutOfRange {
        /// Target label of the stage.
        target: String,
        /// The offending probability.
        probability: f64,
    },

    /// Returned when a stage's classifier or explainer fails for a request.
    #[error("estimator for {target} failed")]
    Estimator {
        /// Target label of the stage.
        target: String,
        /// The underlying estimator error.
        source: EstimatorError,
    },

    /// Returned when training data is inconsistent with the requested chain.
    #[error("invalid training data: {reason}")]
    InvalidTrainingData {
        /// What is wrong with the data.
        reason: String,
    },

    /// Returned when fitting the forest for one target fails.
    #[error("failed to train stage for {target}")]
    Training {
        /// Target label of the stage.
        target: String,
        /// The underlying forest error.
        source: ForestError,
    },

    /// Returned when a stored forest cannot serve as a stage estimator.
    #[error("stored model for {target} is not a usable classifier")]
    InvalidStageModel {
        /// Target label of the stage.
        target: String,
        /// The underlying forest error.
        source: ForestError,
    },

    /// Returned when reading or writing the chain bundle fails.
    #[error("chain bundle artifact error")]
    Artifact {
        /// The underlying forest artifact error.
        #[from]
        source: ForestError,
    },
}
