//! CSV reader for historical cost observations.

use std::path::{Path, PathBuf};

use prognos_cost::CostObservation;
use tracing::{info, instrument};

use crate::IoError;

const REQUIRED_COLUMNS: [&str; 4] = ["age", "condition", "proactive_cost", "reactive_cost"];

/// Reads `age,condition,proactive_cost,reactive_cost` rows into
/// [`CostObservation`]s. Extra columns are ignored.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::MissingColumn`] | A required column is absent from the header |
/// | [`IoError::CsvParse`] | Malformed record or unparseable number |
/// | [`IoError::NonFiniteValue`] | Age or cost is NaN or Inf |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
pub struct CostReader {
    path: PathBuf,
}

impl CostReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the CSV file.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Vec<CostObservation>, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.csv_error(e))?;
        if let Some(column) = REQUIRED_COLUMNS
            .iter()
            .find(|c| !header.iter().any(|h| h == **c))
        {
            return Err(IoError::MissingColumn {
                path: self.path.clone(),
                column: column.to_string(),
            });
        }

        let mut observations = Vec::new();
        for (row_index, result) in rdr.deserialize::<CostObservation>().enumerate() {
            let observation = result.map_err(|e| self.csv_error(e))?;
            for (column, value) in [
                ("age", observation.age),
                ("proactive_cost", observation.proactive_cost),
                ("reactive_cost", observation.reactive_cost),
            ] {
                if !value.is_finite() {
                    return Err(IoError::NonFiniteValue {
                        path: self.path.clone(),
                        row_index,
                        column: column.to_string(),
                        raw: value.to_string(),
                    });
                }
            }
            observations.push(observation);
        }

        if observations.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }
        info!(n_observations = observations.len(), "cost observations loaded");
        Ok(observations)
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}
