//! Configuration builder for Random Forest training.

use crate::error::ForestError;
use crate::result::RandomForestResult;
use crate::split::{SplitCriterion, SplitMethod, Target};

/// Strategy for determining the number of features to consider at each split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaxFeatures {
    /// Square root of total features.
    Sqrt,
    /// Log base 2 of total features.
    Log2,
    /// A fraction of total features (must be in (0.0, 1.0]).
    Fraction(f64),
    /// A fixed count.
    Fixed(usize),
    /// All features (no subsampling).
    All,
}

impl MaxFeatures {
    /// Resolve to a concrete count for `n_features` columns.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidMaxFeatures`] when the count falls outside
    /// `[1, n_features]`.
    pub fn resolve(self, n_features: usize) -> Result<usize, ForestError> {
        let resolved = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().ceil().max(1.0) as usize,
            MaxFeatures::Fraction(f) => (n_features as f64 * f).ceil() as usize,
            MaxFeatures::Fixed(n) => n,
            MaxFeatures::All => n_features,
        };
        if resolved == 0 || resolved > n_features {
            return Err(ForestError::InvalidMaxFeatures {
                max_features: resolved,
                n_features,
            });
        }
        Ok(resolved)
    }
}

/// Configuration for Random Forest training.
///
/// Construct via [`RandomForestConfig::new`], then chain `with_*` methods.
/// The same config fits classifiers and regressors; when no criterion is set
/// classifiers use `Gini` and regressors `SquaredError`.
///
/// # Defaults
///
/// | Parameter            | Default             |
/// |----------------------|---------------------|
/// | `max_features`       | `Sqrt`              |
/// | `max_depth`          | `None`              |
/// | `min_samples_split`  | 2                   |
/// | `min_samples_leaf`   | 1                   |
/// | `criterion`          | by task             |
/// | `split_method`       | `Exact`             |
/// | `seed`               | 42                  |
/// | `bootstrap_fraction` | 1.0                 |
#[derive(Debug, Clone)]
pub struct RandomForestConfig {
    pub(crate) n_trees: usize,
    pub(crate) max_features: MaxFeatures,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) criterion: Option<SplitCriterion>,
    pub(crate) split_method: SplitMethod,
    pub(crate) seed: u64,
    pub(crate) bootstrap_fraction: f64,
}

impl RandomForestConfig {
    /// Create a new config with the given number of trees.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidTreeCount`] if `n_trees` is zero.
    pub fn new(n_trees: usize) -> Result<Self, ForestError> {
        if n_trees == 0 {
            return Err(ForestError::InvalidTreeCount { n_trees });
        }
        Ok(Self {
            n_trees,
            max_features: MaxFeatures::Sqrt,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            criterion: None,
            split_method: SplitMethod::Exact,
            seed: 42,
            bootstrap_fraction: 1.0,
        })
    }

    /// Set the max features strategy.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the maximum tree depth. `None` means unlimited.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum number of samples required in each leaf after a split.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the split quality criterion explicitly.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = Some(criterion);
        self
    }

    /// Set the split-finding strategy.
    #[must_use]
    pub fn with_split_method(mut self, split_method: SplitMethod) -> Self {
        self.split_method = split_method;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the bootstrap fraction (proportion of samples drawn per tree).
    #[must_use]
    pub fn with_bootstrap_fraction(mut self, bootstrap_fraction: f64) -> Self {
        self.bootstrap_fraction = bootstrap_fraction;
        self
    }

    /// Return the number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Train a classification forest.
    ///
    /// `features[sample_idx][feature_idx]` is row-major and `labels` are
    /// zero-based classes. At least two classes are always modelled, so a
    /// binary target with no positive samples still yields a positive-class
    /// probability (of zero).
    ///
    /// # Errors
    ///
    /// | Variant                                   | When                                             |
    /// |-------------------------------------------|--------------------------------------------------|
    /// | [`ForestError::EmptyDataset`]             | `features` is empty                              |
    /// | [`ForestError::ZeroFeatures`]             | rows have zero feature columns                   |
    /// | [`ForestError::FeatureCountMismatch`]     | rows have inconsistent lengths                   |
    /// | [`ForestError::TargetCountMismatch`]      | labels and rows differ in length                 |
    /// | [`ForestError::FeatureNameCountMismatch`] | names and columns differ in length               |
    /// | [`ForestError::NonFiniteValue`]           | any value is NaN or infinite                     |
    /// | [`ForestError::InvalidMaxFeatures`]       | resolved max_features is outside [1, n_features] |
    /// | [`ForestError::InvalidBootstrapFraction`] | bootstrap_fraction is not in (0.0, 1.0]          |
    /// | [`ForestError::CriterionMismatch`]        | criterion is `SquaredError`                      |
    pub fn fit_classifier(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        feature_names: &[String],
    ) -> Result<RandomForestResult, ForestError> {
        let criterion = self.criterion.unwrap_or(SplitCriterion::Gini);
        if !criterion.is_classification() {
            return Err(ForestError::CriterionMismatch {
                criterion: format!("{criterion:?}"),
                task: "classifier",
            });
        }
        let n_classes = (labels.iter().max().copied().unwrap_or(0) + 1).max(2);
        crate::forest::train(
            self,
            criterion,
            features,
            Target::Classes { labels, n_classes },
            feature_names,
        )
    }

    /// Train a regression forest on continuous targets.
    ///
    /// # Errors
    ///
    /// Same as [`RandomForestConfig::fit_classifier`], with
    /// [`ForestError::CriterionMismatch`] raised for `Gini`/`Entropy` and
    /// [`ForestError::NonFiniteTarget`] for a NaN or infinite value.
    pub fn fit_regressor(
        &self,
        features: &[Vec<f64>],
        values: &[f64],
        feature_names: &[String],
    ) -> Result<RandomForestResult, ForestError> {
        let criterion = self.criterion.unwrap_or(SplitCriterion::SquaredError);
        if criterion.is_classification() {
            return Err(ForestError::CriterionMismatch {
                criterion: format!("{criterion:?}"),
                task: "regressor",
            });
        }
        crate::forest::train(self, criterion, features, Target::Values(values), feature_names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_sqrt_rounds_up() {
        assert_eq!(MaxFeatures::Sqrt.resolve(10).unwrap(), 4);
    }

    #[test]
    fn resolve_fixed_out_of_range() {
        let err = MaxFeatures::Fixed(5).resolve(3).unwrap_err();
        assert!(matches!(
            err,
            ForestError::InvalidMaxFeatures { max_features: 5, n_features: 3 }
        ));
    }

    #[test]
    fn zero_trees_rejected() {
        assert!(matches!(
            RandomForestConfig::new(0),
            Err(ForestError::InvalidTreeCount { n_trees: 0 })
        ));
    }

    #[test]
    fn classifier_rejects_squared_error() {
        let config = RandomForestConfig::new(2)
            .unwrap()
            .with_criterion(SplitCriterion::SquaredError);
        let err = config
            .fit_classifier(&[vec![1.0]], &[0], &["x".to_string()])
            .unwrap_err();
        assert!(matches!(err, ForestError::CriterionMismatch { task: "classifier", .. }));
    }
}
