//! I/O error types for prognos-io.

use std::path::PathBuf;

use prognos_chain::ChainError;

/// Errors from file I/O, CSV and JSON parsing, and result serialization.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when a JSON input file is not valid JSON of the expected shape.
    #[error("JSON parse error in {path}")]
    JsonParse {
        /// Path to the JSON file.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// Returned when the input holds a header (or an empty array) but no records.
    #[error("empty dataset (no data rows) in {path}")]
    EmptyDataset {
        /// Path to the input file.
        path: PathBuf,
    },

    /// Returned when a required column is absent from the CSV header.
    #[error("missing column \"{column}\" in {path}")]
    MissingColumn {
        /// Path to the CSV file.
        path: PathBuf,
        /// Name of the absent column.
        column: String,
    },

    /// Returned when no header column carries the target prefix.
    #[error("no target columns with prefix \"{prefix}\" in {path}")]
    NoTargetColumns {
        /// Path to the CSV file.
        path: PathBuf,
        /// Prefix that was searched for.
        prefix: String,
    },

    /// Returned when every non-target column is the identifier or dropped.
    #[error("no feature columns in {path}")]
    NoFeatureColumns {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when a data row has a different number of columns than the header.
    #[error("inconsistent row length in {path}: row {row_index} (patient {patient_id}) has {got} columns, expected {expected}")]
    InconsistentRowLength {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Identifier of the offending row, empty when unavailable.
        patient_id: String,
        /// Expected number of columns (from header).
        expected: usize,
        /// Actual number of columns in this row.
        got: usize,
    },

    /// Returned when a numeric cell is NaN, Inf, or otherwise not a finite float.
    #[error("non-finite value in {path}: row {row_index}, column \"{column}\", raw value \"{raw}\"")]
    NonFiniteValue {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Header name of the column.
        column: String,
        /// The raw string value that failed to parse.
        raw: String,
    },

    /// Returned when a target cell is anything other than `0` or `1`.
    #[error("non-binary target in {path}: row {row_index}, column \"{column}\", raw value \"{raw}\"")]
    NonBinaryTarget {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Target column name.
        column: String,
        /// The raw cell text.
        raw: String,
    },

    /// Returned when the same patient ID appears more than once.
    #[error("duplicate patient ID \"{patient_id}\" in {path}: first at row {first_row}, again at row {second_row}")]
    DuplicatePatientId {
        /// Path to the CSV file.
        path: PathBuf,
        /// The duplicated ID.
        patient_id: String,
        /// Zero-based row index of the first occurrence.
        first_row: usize,
        /// Zero-based row index of the second occurrence.
        second_row: usize,
    },

    /// Returned when the header cannot form a valid feature schema or target.
    #[error("invalid columns in {path}")]
    InvalidColumns {
        /// Path to the CSV file.
        path: PathBuf,
        /// Underlying validation error.
        source: ChainError,
    },

    /// Returned when a raw patient record cannot be encoded.
    #[error("invalid patient record {patient_id}: {reason}")]
    InvalidPatient {
        /// Identifier of the record, or the default identifier.
        patient_id: String,
        /// What is wrong with the record.
        reason: String,
    },

    /// Returned when the experiment name contains characters outside `[a-zA-Z0-9_-]`.
    #[error("invalid experiment name \"{name}\": must match [a-zA-Z0-9_-]+")]
    InvalidExperimentName {
        /// The invalid name.
        name: String,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a result cannot be rendered as JSON.
    #[error("cannot serialize result for {path}")]
    Serialize {
        /// Destination path.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// Returned when a result file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
