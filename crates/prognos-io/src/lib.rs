//! File I/O, validation, and serialization for the prognos pipeline.

mod cost_reader;
mod domain;
mod error;
mod patient;
mod reader;
mod scoring;
mod writer;

pub use cost_reader::CostReader;
pub use domain::{ExperimentName, MultilabelDataset};
pub use error::IoError;
pub use patient::{EncodedPatient, PatientEncoding, PatientReader, encode_patient};
pub use reader::DatasetReader;
pub use scoring::{PatientError, PatientOutcome, score_patient, score_patients};
pub use writer::ResultWriter;
