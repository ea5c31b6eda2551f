//! Domain types for prognos-io.

use prognos_chain::{FeatureSchema, LabelColumn};

use crate::IoError;

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: impl Into<String>) -> Result<Self, IoError> {
        let name = name.into();
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A multilabel training table: one feature row and one 0/1 label per
/// target for every patient.
///
/// Produced by [`DatasetReader`](crate::DatasetReader). `patient_ids[i]`
/// corresponds to `features[i]` and to `labels[i]` of every target column.
#[derive(Debug, Clone)]
pub struct MultilabelDataset {
    patient_ids: Vec<String>,
    schema: FeatureSchema,
    features: Vec<Vec<f64>>,
    targets: Vec<LabelColumn>,
}

impl MultilabelDataset {
    pub(crate) fn new(
        patient_ids: Vec<String>,
        schema: FeatureSchema,
        features: Vec<Vec<f64>>,
        targets: Vec<LabelColumn>,
    ) -> Self {
        Self { patient_ids, schema, features, targets }
    }

    /// Return the patient IDs in file order.
    #[must_use]
    pub fn patient_ids(&self) -> &[String] {
        &self.patient_ids
    }

    /// Return the feature columns, in header order.
    #[must_use]
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Return the feature matrix (row-major).
    #[must_use]
    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    /// Return the label columns, in header order.
    #[must_use]
    pub fn targets(&self) -> &[LabelColumn] {
        &self.targets
    }

    /// Return the number of patients.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.patient_ids.len()
    }

    /// Return the number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.schema.len()
    }
}
