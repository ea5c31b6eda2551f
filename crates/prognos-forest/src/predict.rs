//! Prediction methods for the Random Forest ensemble.

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::error::ForestError;
use crate::forest::{ForestTask, RandomForest};

/// Class probability distribution from a prediction.
#[derive(Debug, Clone)]
pub struct ClassDistribution {
    probs: Vec<f64>,
}

impl ClassDistribution {
    pub(crate) fn new(probs: Vec<f64>) -> Self {
        Self { probs }
    }

    /// Return the predicted class (argmax of probabilities).
    #[must_use]
    pub fn predicted_class(&self) -> usize {
        self.probs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map_or(0, |(idx, _)| idx)
    }

    /// Return the probability of `class`, or 0.0 for an unmodelled class.
    #[must_use]
    pub fn probability(&self, class: usize) -> f64 {
        self.probs.get(class).copied().unwrap_or(0.0)
    }

    /// Return the probability distribution as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.probs
    }
}

impl RandomForest {
    /// Average the per-tree leaf values reached by `sample`.
    pub(crate) fn mean_leaf_value(&self, sample: &[f64]) -> Result<Vec<f64>, ForestError> {
        if sample.len() != self.n_features {
            return Err(ForestError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        let mut avg = vec![0.0f64; self.task.n_outputs()];
        for tree in &self.trees {
            for (acc, v) in avg.iter_mut().zip(tree.predict_value(sample)?) {
                *acc += v;
            }
        }
        let n = self.trees.len() as f64;
        avg.iter_mut().for_each(|v| *v /= n);
        Ok(avg)
    }

    pub(crate) fn require_classifier(&self) -> Result<(), ForestError> {
        match self.task {
            ForestTask::Classifier { .. } => Ok(()),
            ForestTask::Regressor => Err(ForestError::WrongTask {
                expected: "classifier",
                actual: self.task.name(),
            }),
        }
    }

    /// Return the averaged class probability distribution for a single sample.
    ///
    /// # Errors
    ///
    /// | Variant                                    | When                               |
    /// |--------------------------------------------|------------------------------------|
    /// | [`ForestError::WrongTask`]                 | the forest is a regressor          |
    /// | [`ForestError::PredictionFeatureMismatch`] | `sample.len() != n_features`       |
    pub fn predict_proba(&self, sample: &[f64]) -> Result<ClassDistribution, ForestError> {
        self.require_classifier()?;
        Ok(ClassDistribution::new(self.mean_leaf_value(sample)?))
    }

    /// Return the probability of class 1 for a binary classifier.
    ///
    /// # Errors
    ///
    /// Same as [`RandomForest::predict_proba`].
    pub fn positive_probability(&self, sample: &[f64]) -> Result<f64, ForestError> {
        Ok(self.predict_proba(sample)?.probability(1))
    }

    /// Predict the class label for a single sample.
    ///
    /// # Errors
    ///
    /// Same as [`RandomForest::predict_proba`].
    pub fn predict(&self, sample: &[f64]) -> Result<usize, ForestError> {
        Ok(self.predict_proba(sample)?.predicted_class())
    }

    /// Predict a continuous value (mean of tree predictions).
    ///
    /// # Errors
    ///
    /// | Variant                                    | When                               |
    /// |--------------------------------------------|------------------------------------|
    /// | [`ForestError::WrongTask`]                 | the forest is a classifier         |
    /// | [`ForestError::PredictionFeatureMismatch`] | `sample.len() != n_features`       |
    pub fn predict_value(&self, sample: &[f64]) -> Result<f64, ForestError> {
        if self.task != ForestTask::Regressor {
            return Err(ForestError::WrongTask {
                expected: "regressor",
                actual: self.task.name(),
            });
        }
        Ok(self.mean_leaf_value(sample)?[0])
    }

    /// Return probability distributions for a batch of samples in parallel.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by [`RandomForest::predict_proba`].
    pub fn predict_proba_batch(
        &self,
        features: &[Vec<f64>],
    ) -> Result<Vec<ClassDistribution>, ForestError> {
        features
            .into_par_iter()
            .map(|sample| self.predict_proba(sample))
            .collect()
    }

    /// Predict continuous values for a batch of samples in parallel.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by [`RandomForest::predict_value`].
    pub fn predict_value_batch(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, ForestError> {
        features
            .into_par_iter()
            .map(|sample| self.predict_value(sample))
            .collect()
    }

    /// Return the number of features this forest was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return what the forest predicts.
    #[must_use]
    pub fn task(&self) -> ForestTask {
        self.task
    }

    /// Return the number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return the feature names, in column order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }
}
