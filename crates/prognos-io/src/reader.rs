//! Multilabel training CSV reader with full input validation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use prognos_chain::{ConditionTarget, FeatureSchema, LabelColumn};
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::MultilabelDataset;

/// Identifier column of the claims extract.
pub const DEFAULT_ID_COLUMN: &str = "DESYNPUF_ID";

/// Prefix that marks an outcome column.
pub const DEFAULT_TARGET_PREFIX: &str = "HAD_";

/// Columns that are neither features nor targets.
pub const DEFAULT_DROPPED_COLUMNS: [&str; 5] = [
    "BENE_BIRTH_DT",
    "BENE_DEATH_DT",
    "SP_STATE_CODE",
    "BENE_COUNTY_CD",
    "was_hospitalized_in_2010",
];

enum Column {
    Id,
    Dropped,
    Feature,
    Target,
}

/// Reads a multilabel training table from a CSV file.
///
/// Every header column is one of: the identifier column, a dropped column,
/// a target (name starts with the target prefix, cells are `0` or `1`), or a
/// numeric feature. Dropped columns that are absent from the header are
/// ignored. Features and targets keep their header order.
///
/// # Defaults
///
/// | Parameter         | Default                                 |
/// |-------------------|-----------------------------------------|
/// | `id_column`       | `DESYNPUF_ID`                           |
/// | `target_prefix`   | `HAD_`                                  |
/// | `dropped_columns` | [`DEFAULT_DROPPED_COLUMNS`]             |
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::MissingColumn`] | Identifier column absent from the header |
/// | [`IoError::NoTargetColumns`] | No column carries the target prefix |
/// | [`IoError::NoFeatureColumns`] | Nothing left to use as a feature |
/// | [`IoError::InvalidColumns`] | Duplicate feature names |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::NonFiniteValue`] | Feature cell is NaN, Inf, or unparseable |
/// | [`IoError::NonBinaryTarget`] | Target cell is not `0` or `1` |
/// | [`IoError::DuplicatePatientId`] | Same identifier appears twice |
pub struct DatasetReader {
    path: PathBuf,
    id_column: String,
    target_prefix: String,
    dropped_columns: Vec<String>,
}

impl DatasetReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            id_column: DEFAULT_ID_COLUMN.to_string(),
            target_prefix: DEFAULT_TARGET_PREFIX.to_string(),
            dropped_columns: DEFAULT_DROPPED_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Set the identifier column.
    #[must_use]
    pub fn with_id_column(mut self, id_column: impl Into<String>) -> Self {
        self.id_column = id_column.into();
        self
    }

    /// Set the prefix that marks target columns.
    #[must_use]
    pub fn with_target_prefix(mut self, target_prefix: impl Into<String>) -> Self {
        self.target_prefix = target_prefix.into();
        self
    }

    /// Replace the list of ignored columns.
    #[must_use]
    pub fn with_dropped_columns(mut self, dropped_columns: Vec<String>) -> Self {
        self.dropped_columns = dropped_columns;
        self
    }

    /// Read and validate the CSV file, returning a [`MultilabelDataset`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<MultilabelDataset, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) so that our own InconsistentRowLength check fires
        // instead of a low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.csv_error(e))?.clone();
        let layout = self.classify(&header);
        let id_index = layout
            .iter()
            .position(|c| matches!(c, Column::Id))
            .ok_or_else(|| IoError::MissingColumn {
                path: self.path.clone(),
                column: self.id_column.clone(),
            })?;

        let column_names = |kind: fn(&Column) -> bool| -> Vec<String> {
            header
                .iter()
                .zip(&layout)
                .filter(|(_, c)| kind(c))
                .map(|(name, _)| name.to_string())
                .collect()
        };
        let feature_names = column_names(|c| matches!(c, Column::Feature));
        let target_names = column_names(|c| matches!(c, Column::Target));
        if target_names.is_empty() {
            return Err(IoError::NoTargetColumns {
                path: self.path.clone(),
                prefix: self.target_prefix.clone(),
            });
        }
        if feature_names.is_empty() {
            return Err(IoError::NoFeatureColumns {
                path: self.path.clone(),
            });
        }
        let invalid_columns = |source| IoError::InvalidColumns {
            path: self.path.clone(),
            source,
        };
        let schema = FeatureSchema::new(feature_names).map_err(invalid_columns)?;
        let targets = target_names
            .into_iter()
            .map(ConditionTarget::new)
            .collect::<Result<Vec<_>, _>>()
            .map_err(invalid_columns)?;
        debug!(
            n_features = schema.len(),
            n_targets = targets.len(),
            "classified CSV header"
        );

        let expected_cols = header.len();
        let mut patient_ids = Vec::new();
        let mut features = Vec::new();
        let mut labels: Vec<Vec<usize>> = vec![Vec::new(); targets.len()];
        let mut seen: HashMap<String, usize> = HashMap::new();

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;
            let patient_id = record.get(id_index).unwrap_or("").trim().to_string();

            if record.len() != expected_cols {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    patient_id,
                    expected: expected_cols,
                    got: record.len(),
                });
            }

            if let Some(&first_row) = seen.get(&patient_id) {
                return Err(IoError::DuplicatePatientId {
                    path: self.path.clone(),
                    patient_id,
                    first_row,
                    second_row: row_index,
                });
            }
            seen.insert(patient_id.clone(), row_index);

            let mut row = Vec::with_capacity(schema.len());
            let mut target_index = 0;
            for ((raw, column), kind) in record.iter().zip(header.iter()).zip(&layout) {
                match kind {
                    Column::Feature => row.push(self.parse_feature(row_index, column, raw)?),
                    Column::Target => {
                        labels[target_index].push(self.parse_target(row_index, column, raw)?);
                        target_index += 1;
                    }
                    Column::Id | Column::Dropped => {}
                }
            }

            patient_ids.push(patient_id);
            features.push(row);
        }

        if patient_ids.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        let targets: Vec<LabelColumn> = targets
            .into_iter()
            .zip(labels)
            .map(|(target, labels)| LabelColumn { target, labels })
            .collect();
        info!(
            n_patients = patient_ids.len(),
            n_features = schema.len(),
            n_targets = targets.len(),
            "training dataset loaded"
        );

        Ok(MultilabelDataset::new(patient_ids, schema, features, targets))
    }

    fn classify(&self, header: &csv::StringRecord) -> Vec<Column> {
        header
            .iter()
            .map(|name| {
                if name == self.id_column {
                    Column::Id
                } else if self.dropped_columns.iter().any(|d| d == name) {
                    Column::Dropped
                } else if name.starts_with(&self.target_prefix) {
                    Column::Target
                } else {
                    Column::Feature
                }
            })
            .collect()
    }

    fn parse_feature(&self, row_index: usize, column: &str, raw: &str) -> Result<f64, IoError> {
        let non_finite = || IoError::NonFiniteValue {
            path: self.path.clone(),
            row_index,
            column: column.to_string(),
            raw: raw.to_string(),
        };
        let value: f64 = raw.trim().parse().map_err(|_| non_finite())?;
        if !value.is_finite() {
            return Err(non_finite());
        }
        Ok(value)
    }

    fn parse_target(&self, row_index: usize, column: &str, raw: &str) -> Result<usize, IoError> {
        match raw.trim().parse::<f64>() {
            Ok(v) if v == 0.0 => Ok(0),
            Ok(v) if v == 1.0 => Ok(1),
            _ => Err(IoError::NonBinaryTarget {
                path: self.path.clone(),
                row_index,
                column: column.to_string(),
                raw: raw.to_string(),
            }),
        }
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}
