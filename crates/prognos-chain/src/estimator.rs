//! Estimator capabilities a chain stage relies on.
//!
//! A stage needs a positive-class probability and a per-feature attribution
//! for the same prediction. [`ForestEstimator`] provides both from one fitted
//! random forest; tests substitute their own implementations.

use prognos_forest::{ForestError, ForestTask, RandomForest};

use crate::schema::FeatureVector;

/// One feature's contribution to a single prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribution {
    /// Feature name.
    pub feature: String,
    /// Signed contribution; larger magnitude means more influence.
    pub score: f64,
}

/// Errors raised by estimators while serving a request.
#[derive(Debug, thiserror::Error)]
pub enum EstimatorError {
    /// The underlying forest rejected the input.
    #[error(transparent)]
    Forest(#[from] ForestError),

    /// Any other estimator failure.
    #[error("{reason}")]
    Failed {
        /// Human-readable failure description.
        reason: String,
    },
}

/// Produces the probability of the positive class for one feature vector.
pub trait RiskClassifier: Send + Sync {
    /// Return P(positive) for `features`.
    ///
    /// # Errors
    ///
    /// Returns [`EstimatorError`] when the estimator cannot score the input.
    fn predict_probability(&self, features: &FeatureVector) -> Result<f64, EstimatorError>;

    /// Feature names the estimator was fitted on, in order, when known.
    ///
    /// Chains check declared inputs at construction time.
    fn expected_features(&self) -> Option<&[String]> {
        None
    }
}

/// Attributes one prediction to its input features.
pub trait RiskExplainer: Send + Sync {
    /// Return one attribution per input feature, in input order.
    ///
    /// # Errors
    ///
    /// Returns [`EstimatorError`] when the estimator cannot explain the input.
    fn explain(&self, features: &FeatureVector) -> Result<Vec<Attribution>, EstimatorError>;
}

/// Positive-class index of a binary classifier forest.
const POSITIVE_CLASS: usize = 1;

/// A binary classification forest serving as both classifier and explainer.
#[derive(Debug, Clone)]
pub struct ForestEstimator {
    forest: RandomForest,
}

impl ForestEstimator {
    /// Wrap a fitted classification forest.
    ///
    /// # Errors
    ///
    /// | Variant                           | When                                   |
    /// |-----------------------------------|----------------------------------------|
    /// | [`ForestError::MalformedModel`]   | the forest fails [`RandomForest::validate`] |
    /// | [`ForestError::WrongTask`]        | the forest is a regressor              |
    pub fn new(forest: RandomForest) -> Result<Self, ForestError> {
        forest.validate()?;
        match forest.task() {
            ForestTask::Classifier { .. } => Ok(Self { forest }),
            ForestTask::Regressor => Err(ForestError::WrongTask {
                expected: "classifier",
                actual: "regressor",
            }),
        }
    }

    /// Borrow the wrapped forest.
    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Consume the estimator and return the forest.
    #[must_use]
    pub fn into_forest(self) -> RandomForest {
        self.forest
    }
}

impl RiskClassifier for ForestEstimator {
    fn predict_probability(&self, features: &FeatureVector) -> Result<f64, EstimatorError> {
        Ok(self.forest.positive_probability(features.values())?)
    }

    fn expected_features(&self) -> Option<&[String]> {
        Some(self.forest.feature_names())
    }
}

impl RiskExplainer for ForestEstimator {
    fn explain(&self, features: &FeatureVector) -> Result<Vec<Attribution>, EstimatorError> {
        let contributions = self.forest.contributions(features.values(), POSITIVE_CLASS)?;
        Ok(features
            .names()
            .iter()
            .zip(contributions.values)
            .map(|(name, score)| Attribution {
                feature: name.clone(),
                score,
            })
            .collect())
    }
}
