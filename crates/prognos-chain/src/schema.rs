//! Feature schema and schema-aligned feature vectors.

use std::collections::{BTreeMap, HashSet};

use crate::error::ChainError;

/// Fixed, ordered list of unique feature names a chain was trained on.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl TryFrom<Vec<String>> for FeatureSchema {
    type Error = ChainError;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(names)
    }
}

impl From<FeatureSchema> for Vec<String> {
    fn from(schema: FeatureSchema) -> Self {
        schema.names
    }
}

impl FeatureSchema {
    /// Build a schema from training column names.
    ///
    /// # Errors
    ///
    /// | Variant                          | When                         |
    /// |----------------------------------|------------------------------|
    /// | [`ChainError::EmptySchema`]      | `names` is empty             |
    /// | [`ChainError::DuplicateFeature`] | a name appears more than once |
    pub fn new(names: Vec<String>) -> Result<Self, ChainError> {
        if names.is_empty() {
            return Err(ChainError::EmptySchema);
        }
        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(ChainError::DuplicateFeature { name: name.clone() });
            }
        }
        Ok(Self { names })
    }

    /// Return the feature names in column order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Return the number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always `false`: a schema holds at least one feature.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Reindex a raw feature mapping onto this schema.
    ///
    /// Missing features become 0.0 and unknown features are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::NonFiniteFeature`] when a kept value is NaN or
    /// infinite.
    pub fn align(&self, raw: &BTreeMap<String, f64>) -> Result<FeatureVector, ChainError> {
        self.align_with(|name| raw.get(name).copied())
    }

    /// Reindex an existing vector onto this schema. Aligning an already
    /// aligned vector returns an equal vector.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::NonFiniteFeature`] when a kept value is NaN or
    /// infinite.
    pub fn align_vector(&self, vector: &FeatureVector) -> Result<FeatureVector, ChainError> {
        if vector.names == self.names {
            return Ok(vector.clone());
        }
        self.align_with(|name| vector.get(name))
    }

    fn align_with(&self, lookup: impl Fn(&str) -> Option<f64>) -> Result<FeatureVector, ChainError> {
        let values = self
            .names
            .iter()
            .map(|name| match lookup(name.as_str()) {
                Some(value) if !value.is_finite() => Err(ChainError::NonFiniteFeature {
                    name: name.clone(),
                    value,
                }),
                Some(value) => Ok(value),
                None => Ok(0.0),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FeatureVector {
            names: self.names.clone(),
            values,
        })
    }
}

/// Ordered `(name, value)` pairs fed to a chain stage.
///
/// Vectors are never mutated in place; [`FeatureVector::with_feature`] derives
/// a new vector.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    names: Vec<String>,
    values: Vec<f64>,
}

impl FeatureVector {
    /// Return a copy with `name` set to `value`, overwriting an existing
    /// feature in place or appending a new one at the end.
    #[must_use]
    pub fn with_feature(&self, name: &str, value: f64) -> Self {
        let mut next = self.clone();
        match next.names.iter().position(|n| n == name) {
            Some(idx) => next.values[idx] = value,
            None => {
                next.names.push(name.to_string());
                next.values.push(value);
            }
        }
        next
    }

    /// Return the value of `name`, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.values[idx])
    }

    /// Return the feature names in order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Return the feature values in order.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Return the number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Return `true` if the vector has no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate over `(name, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}
