use std::path::PathBuf;

/// Errors from forest training, prediction, and artifact persistence.
#[derive(Debug, thiserror::Error)]
pub enum ForestError {
    /// Returned when n_trees is zero.
    #[error("n_trees must be at least 1, got {n_trees}")]
    InvalidTreeCount {
        /// The invalid n_trees value provided.
        n_trees: usize,
    },

    /// Returned when max_depth is zero.
    #[error("max_depth must be at least 1, got {max_depth}")]
    InvalidMaxDepth {
        /// The invalid max_depth value provided.
        max_depth: usize,
    },

    /// Returned when min_samples_split is less than 2.
    #[error("min_samples_split must be at least 2, got {min_samples_split}")]
    InvalidMinSamplesSplit {
        /// The invalid min_samples_split value provided.
        min_samples_split: usize,
    },

    /// Returned when min_samples_leaf is zero.
    #[error("min_samples_leaf must be at least 1, got {min_samples_leaf}")]
    InvalidMinSamplesLeaf {
        /// The invalid min_samples_leaf value provided.
        min_samples_leaf: usize,
    },

    /// Returned when max_features resolves to 0 or exceeds n_features.
    #[error("max_features resolved to {max_features}, but must be in [1, {n_features}]")]
    InvalidMaxFeatures {
        /// The resolved max_features value.
        max_features: usize,
        /// The number of features in the dataset.
        n_features: usize,
    },

    /// Returned when bootstrap_fraction is not in (0.0, 1.0].
    #[error("bootstrap_fraction must be in (0.0, 1.0], got {fraction}")]
    InvalidBootstrapFraction {
        /// The invalid bootstrap_fraction value provided.
        fraction: f64,
    },

    /// Returned when a criterion is paired with the wrong kind of target.
    #[error("criterion {criterion} cannot be used to fit a {task}")]
    CriterionMismatch {
        /// Debug name of the configured criterion.
        criterion: String,
        /// The task being fitted ("classifier" or "regressor").
        task: &'static str,
    },

    /// Returned when the training dataset has zero samples.
    #[error("training dataset has zero samples")]
    EmptyDataset,

    /// Returned when the training dataset has zero feature columns.
    #[error("training dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when a sample has a different number of features than expected.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the sample.
        got: usize,
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when the number of targets differs from the number of samples.
    #[error("got {targets} targets for {samples} samples")]
    TargetCountMismatch {
        /// Number of feature rows.
        samples: usize,
        /// Number of labels or regression values.
        targets: usize,
    },

    /// Returned when the number of feature names differs from the feature width.
    #[error("got {names} feature names for {n_features} feature columns")]
    FeatureNameCountMismatch {
        /// Number of feature columns.
        n_features: usize,
        /// Number of names supplied.
        names: usize,
    },

    /// Returned when a sample has a different number of features at prediction time.
    #[error("prediction input has {got} features, expected {expected}")]
    PredictionFeatureMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the prediction input.
        got: usize,
    },

    /// Returned when a training feature value is NaN or infinite.
    #[error("non-finite value at sample {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The zero-based index of the offending feature column.
        feature_index: usize,
    },

    /// Returned when a regression target is NaN or infinite.
    #[error("non-finite regression target at sample {sample_index}")]
    NonFiniteTarget {
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when a classification-only call is made on a regressor or vice versa.
    #[error("operation requires a {expected}, but the forest is a {actual}")]
    WrongTask {
        /// Task the operation needs.
        expected: &'static str,
        /// Task the forest was trained for.
        actual: &'static str,
    },

    /// Returned when an output index is outside the forest's output width.
    #[error("output {output} out of range for a forest with {n_outputs} outputs")]
    OutputOutOfRange {
        /// The requested output (class) index.
        output: usize,
        /// Number of outputs the forest produces.
        n_outputs: usize,
    },

    /// Returned when artifact serialization fails.
    #[error("failed to serialize {kind} artifact")]
    SerializeArtifact {
        /// Artifact kind being written.
        kind: String,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when artifact deserialization fails.
    #[error("failed to deserialize artifact from {path}")]
    DeserializeArtifact {
        /// Path to the artifact file that could not be deserialized.
        path: PathBuf,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when writing the artifact file fails.
    #[error("failed to write artifact to {path}")]
    WriteArtifact {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading the artifact file fails.
    #[error("failed to read artifact from {path}")]
    ReadArtifact {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when loading an artifact with an incompatible format version.
    #[error("incompatible artifact version in {path}: expected {expected}, found {found}")]
    IncompatibleArtifactVersion {
        /// The format version this build expects.
        expected: u32,
        /// The format version found in the file.
        found: u32,
        /// Path to the artifact file.
        path: PathBuf,
    },

    /// Returned when a fitted forest is structurally unusable, typically one
    /// decoded from a damaged or hand-edited artifact.
    #[error("malformed model: {reason}")]
    MalformedModel {
        /// What is wrong with the forest.
        reason: String,
    },

    /// Returned when the artifact holds a different kind of model than requested.
    #[error("artifact {path} holds a {found} model, expected {expected}")]
    ArtifactKindMismatch {
        /// Kind the caller asked for.
        expected: String,
        /// Kind stored in the file.
        found: String,
        /// Path to the artifact file.
        path: PathBuf,
    },
}
