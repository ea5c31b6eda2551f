//! Raw patient records and their encoding into named numeric features.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::IoError;

/// A patient ready for stratification.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedPatient {
    /// Identifier echoed in every result.
    pub id: String,
    /// Age in years, when the record carries a numeric age.
    pub age: Option<f64>,
    /// Named numeric features, not yet aligned to any schema.
    pub features: BTreeMap<String, f64>,
}

/// Field names used when encoding raw patient records.
///
/// # Defaults
///
/// | Parameter    | Default       |
/// |--------------|---------------|
/// | `id_field`   | `DESYNPUF_ID` |
/// | `age_field`  | `Age`         |
/// | `default_id` | `UNKNOWN`     |
#[derive(Debug, Clone)]
pub struct PatientEncoding {
    id_field: String,
    age_field: String,
    default_id: String,
}

impl PatientEncoding {
    /// Create the default encoding.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id_field: "DESYNPUF_ID".to_string(),
            age_field: "Age".to_string(),
            default_id: "UNKNOWN".to_string(),
        }
    }

    /// Set the identifier field.
    #[must_use]
    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    /// Set the age field.
    #[must_use]
    pub fn with_age_field(mut self, age_field: impl Into<String>) -> Self {
        self.age_field = age_field.into();
        self
    }

    /// Set the identifier used when a record has none.
    #[must_use]
    pub fn with_default_id(mut self, default_id: impl Into<String>) -> Self {
        self.default_id = default_id.into();
        self
    }

    /// Identifier of a raw record: the id field as text, or the default.
    #[must_use]
    pub fn patient_id(&self, raw: &Value) -> String {
        match raw.get(&self.id_field) {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => self.default_id.clone(),
        }
    }
}

impl Default for PatientEncoding {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode one raw JSON patient object.
///
/// Numbers pass through and booleans become `1.0`/`0.0`. A string value
/// `v` of field `f` becomes the indicator feature `f_v` = `1.0`, with `[`,
/// `]` and `<` in the name replaced by `_`. Nulls, nested arrays and nested
/// objects are skipped. The identifier field is never a feature; the age
/// field is both a feature and the patient's age.
///
/// # Errors
///
/// Returns [`IoError::InvalidPatient`] when `raw` is not a JSON object or a
/// number is not representable as a finite `f64`.
pub fn encode_patient(raw: &Value, encoding: &PatientEncoding) -> Result<EncodedPatient, IoError> {
    let id = encoding.patient_id(raw);
    let Value::Object(fields) = raw else {
        return Err(IoError::InvalidPatient {
            patient_id: id,
            reason: "record is not a JSON object".to_string(),
        });
    };

    let mut features = BTreeMap::new();
    for (field, value) in fields {
        if *field == encoding.id_field {
            continue;
        }
        match value {
            Value::Number(n) => {
                let v = n.as_f64().filter(|v| v.is_finite()).ok_or_else(|| {
                    IoError::InvalidPatient {
                        patient_id: id.clone(),
                        reason: format!("field {field} is not a finite number"),
                    }
                })?;
                features.insert(field.clone(), v);
            }
            Value::Bool(b) => {
                features.insert(field.clone(), if *b { 1.0 } else { 0.0 });
            }
            Value::String(s) => {
                features.insert(indicator_name(field, s), 1.0);
            }
            Value::Null => {}
            Value::Array(_) | Value::Object(_) => {
                debug!(patient_id = %id, field = %field, "skipping nested field");
            }
        }
    }

    let age = match fields.get(&encoding.age_field) {
        Some(Value::Number(_)) => features.get(&encoding.age_field).copied(),
        _ => None,
    };
    Ok(EncodedPatient { id, age, features })
}

fn indicator_name(field: &str, value: &str) -> String {
    format!("{field}_{value}").replace(['[', ']', '<'], "_")
}

/// Reads patient records from a JSON file holding one object or an array of
/// objects.
///
/// Records are returned raw so that each can be encoded, and fail, on its own.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::JsonParse`] | Not valid JSON |
/// | [`IoError::EmptyDataset`] | An empty array |
pub struct PatientReader {
    path: PathBuf,
}

impl PatientReader {
    /// Create a new reader for the given JSON file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read the file into raw records.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Vec<Value>, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;
        let parsed: Value = serde_json::from_reader(std::io::BufReader::new(file)).map_err(
            |e| IoError::JsonParse {
                path: self.path.clone(),
                source: e,
            },
        )?;
        let records = match parsed {
            Value::Array(records) => records,
            single => vec![single],
        };
        if records.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }
        info!(n_patients = records.len(), "patient records loaded");
        Ok(records)
    }
}
