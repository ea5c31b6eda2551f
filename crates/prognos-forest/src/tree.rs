use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::{
    ForestError,
    node::{Node, NodeIndex},
    split::{NodeStats, SplitCriterion, SplitMethod, SplitParams, Target, find_best_split},
};

/// Nodes whose impurity falls below this are treated as pure.
const PURE_EPSILON: f64 = 1e-12;

/// Configuration for a single CART decision tree.
///
/// Construct via [`DecisionTreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default               |
/// |---------------------|-----------------------|
/// | `criterion`         | `Gini`                |
/// | `split_method`      | `Exact`               |
/// | `max_depth`         | `None` (unlimited)    |
/// | `min_samples_split` | 2                     |
/// | `min_samples_leaf`  | 1                     |
/// | `max_features`      | `None` (all features) |
/// | `seed`              | 42                    |
#[derive(Debug, Clone)]
pub struct DecisionTreeConfig {
    pub(crate) criterion: SplitCriterion,
    pub(crate) split_method: SplitMethod,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_features: Option<usize>,
    pub(crate) seed: u64,
}

impl DecisionTreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            criterion: SplitCriterion::Gini,
            split_method: SplitMethod::Exact,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            seed: 42,
        }
    }

    /// Set the split quality criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the split-finding strategy.
    #[must_use]
    pub fn with_split_method(mut self, split_method: SplitMethod) -> Self {
        self.split_method = split_method;
        self
    }

    /// Set the maximum tree depth (root is depth 0). `None` grows until pure.
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

    /// Set the maximum number of features to consider at each split.
    #[must_use]
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Train a classification tree. Labels are zero-based; the tree models
    /// `max(label) + 1` classes.
    ///
    /// # Errors
    ///
    /// See [`DecisionTreeConfig::fit_regressor`]; additionally returns
    /// [`ForestError::CriterionMismatch`] for `SquaredError`.
    pub fn fit_classifier(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
    ) -> Result<DecisionTree, ForestError> {
        if !self.criterion.is_classification() {
            return Err(ForestError::CriterionMismatch {
                criterion: format!("{:?}", self.criterion),
                task: "classifier",
            });
        }
        let n_classes = labels.iter().max().copied().unwrap_or(0) + 1;
        self.fit_target(features, Target::Classes { labels, n_classes })
    }

    /// Train a regression tree on continuous targets.
    ///
    /// # Errors
    ///
    /// | Variant                                | When                                            |
    /// |----------------------------------------|-------------------------------------------------|
    /// | [`ForestError::EmptyDataset`]          | `features` is empty                             |
    /// | [`ForestError::ZeroFeatures`]          | rows have zero feature columns                  |
    /// | [`ForestError::FeatureCountMismatch`]  | rows have inconsistent lengths                  |
    /// | [`ForestError::TargetCountMismatch`]   | targets and rows differ in length               |
    /// | [`ForestError::NonFiniteValue`]        | any feature value is NaN or infinite            |
    /// | [`ForestError::NonFiniteTarget`]       | any regression target is NaN or infinite        |
    /// | [`ForestError::InvalidMaxFeatures`]    | `max_features` resolves outside [1, n_features] |
    /// | [`ForestError::InvalidMaxDepth`]       | `max_depth` is `Some(0)`                        |
    /// | [`ForestError::InvalidMinSamplesSplit`]| `min_samples_split` < 2                         |
    /// | [`ForestError::InvalidMinSamplesLeaf`] | `min_samples_leaf` < 1                          |
    pub fn fit_regressor(
        &self,
        features: &[Vec<f64>],
        values: &[f64],
    ) -> Result<DecisionTree, ForestError> {
        if self.criterion.is_classification() {
            return Err(ForestError::CriterionMismatch {
                criterion: format!("{:?}", self.criterion),
                task: "regressor",
            });
        }
        self.fit_target(features, Target::Values(values))
    }

    #[instrument(skip_all, fields(n_samples = features.len()))]
    pub(crate) fn fit_target(
        &self,
        features: &[Vec<f64>],
        target: Target<'_>,
    ) -> Result<DecisionTree, ForestError> {
        let n_features = validate_training_set(features, target)?;
        self.validate()?;

        let max_features = self.max_features.unwrap_or(n_features);
        if max_features == 0 || max_features > n_features {
            return Err(ForestError::InvalidMaxFeatures {
                max_features,
                n_features,
            });
        }

        let col_features: Vec<Vec<f64>> = (0..n_features)
            .map(|feat_idx| features.iter().map(|row| row[feat_idx]).collect())
            .collect();

        let params = SplitParams {
            criterion: self.criterion,
            method: self.split_method,
            max_features,
            min_samples_leaf: self.min_samples_leaf,
        };

        let sample_indices: Vec<usize> = (0..features.len()).collect();
        let mut builder = TreeBuilder {
            col_features: &col_features,
            target,
            params,
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            rng: ChaCha8Rng::seed_from_u64(self.seed),
            arena: Vec::new(),
        };
        builder.grow(&sample_indices, 0);

        debug!(n_nodes = builder.arena.len(), "decision tree built");

        Ok(DecisionTree {
            nodes: builder.arena,
            n_features,
            n_outputs: target.n_outputs(),
        })
    }

    fn validate(&self) -> Result<(), ForestError> {
        if self.max_depth == Some(0) {
            return Err(ForestError::InvalidMaxDepth { max_depth: 0 });
        }
        if self.min_samples_split < 2 {
            return Err(ForestError::InvalidMinSamplesSplit {
                min_samples_split: self.min_samples_split,
            });
        }
        if self.min_samples_leaf < 1 {
            return Err(ForestError::InvalidMinSamplesLeaf {
                min_samples_leaf: self.min_samples_leaf,
            });
        }
        Ok(())
    }
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate a row-major training matrix against its targets.
///
/// Returns the feature width.
pub(crate) fn validate_training_set(
    features: &[Vec<f64>],
    target: Target<'_>,
) -> Result<usize, ForestError> {
    let Some(first) = features.first() else {
        return Err(ForestError::EmptyDataset);
    };
    let n_features = first.len();
    if n_features == 0 {
        return Err(ForestError::ZeroFeatures);
    }
    if target.len() != features.len() {
        return Err(ForestError::TargetCountMismatch {
            samples: features.len(),
            targets: target.len(),
        });
    }
    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(ForestError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
            return Err(ForestError::NonFiniteValue {
                sample_index,
                feature_index,
            });
        }
    }
    if let Target::Values(values) = target
        && let Some(sample_index) = values.iter().position(|v| !v.is_finite())
    {
        return Err(ForestError::NonFiniteTarget { sample_index });
    }
    Ok(n_features)
}

/// Recursive arena builder for one tree.
struct TreeBuilder<'a> {
    col_features: &'a [Vec<f64>],
    target: Target<'a>,
    params: SplitParams,
    max_depth: Option<usize>,
    min_samples_split: usize,
    rng: ChaCha8Rng,
    arena: Vec<Node>,
}

impl TreeBuilder<'_> {
    fn grow(&mut self, sample_indices: &[usize], depth: usize) -> NodeIndex {
        let stats = NodeStats::from_samples(self.target, sample_indices);
        let impurity = stats.impurity(self.params.criterion);
        let value = stats.value();
        let n_samples = sample_indices.len();

        let depth_exceeded = self.max_depth.is_some_and(|max_d| depth >= max_d);
        let stop = depth_exceeded
            || n_samples < self.min_samples_split
            || impurity.value() <= PURE_EPSILON;

        let split = if stop {
            None
        } else {
            find_best_split(
                self.col_features,
                self.target,
                sample_indices,
                self.params,
                &mut self.rng,
            )
        };

        let Some(split) = split else {
            self.arena.push(Node::Leaf {
                value,
                impurity,
                n_samples,
            });
            return NodeIndex::new(self.arena.len() - 1);
        };

        // Reserve the slot so the root stays at index 0, then fill it in.
        let node_idx = self.arena.len();
        self.arena.push(Node::Leaf {
            value: Vec::new(),
            impurity,
            n_samples,
        });

        let left = self.grow(&split.left_indices, depth + 1);
        let right = self.grow(&split.right_indices, depth + 1);

        self.arena[node_idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
            impurity,
            n_samples,
            impurity_decrease: split.impurity_decrease,
            value,
        };

        NodeIndex::new(node_idx)
    }
}

/// A fitted CART decision tree.
///
/// Stored as an arena-based `Vec<Node>` with index references; the root is
/// always at index 0.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
    pub(crate) n_outputs: usize,
}

impl DecisionTree {
    /// Return the leaf value reached by `sample`.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict_value(&self, sample: &[f64]) -> Result<&[f64], ForestError> {
        self.check_width(sample)?;
        let leaf = self.traverse(sample);
        Ok(self.nodes[leaf.index()].value())
    }

    /// Return the predicted class (argmax of the leaf distribution).
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, ForestError> {
        let value = self.predict_value(sample)?;
        Ok(value
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map_or(0, |(idx, _)| idx))
    }

    /// Return the nodes visited from the root to the leaf reached by `sample`.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn decision_path(&self, sample: &[f64]) -> Result<Vec<&Node>, ForestError> {
        self.check_width(sample)?;
        let mut path = vec![&self.nodes[NodeIndex::ROOT.index()]];
        while let Some(next) = path[path.len() - 1].route(sample) {
            path.push(&self.nodes[next.index()]);
        }
        Ok(path)
    }

    /// Compute Mean Decrease in Impurity (MDI) feature importances, normalized
    /// to sum to 1.0 (all zeros for a single-leaf tree).
    #[must_use]
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0f64; self.n_features];
        for node in &self.nodes {
            if let Node::Split {
                feature,
                impurity_decrease,
                ..
            } = node
            {
                totals[feature.index()] += impurity_decrease;
            }
        }
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            totals.iter_mut().for_each(|v| *v /= sum);
        }
        totals
    }

    /// Return the total number of nodes in the tree.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the maximum depth of the tree; a single leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut max_depth = 0usize;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((idx, d)) = stack.pop() {
            match &self.nodes[idx] {
                Node::Leaf { .. } => max_depth = max_depth.max(d),
                Node::Split { left, right, .. } => {
                    stack.push((left.index(), d + 1));
                    stack.push((right.index(), d + 1));
                }
            }
        }
        max_depth
    }

    fn check_width(&self, sample: &[f64]) -> Result<(), ForestError> {
        if sample.len() != self.n_features {
            return Err(ForestError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        Ok(())
    }

    fn traverse(&self, sample: &[f64]) -> NodeIndex {
        let mut idx = NodeIndex::ROOT;
        while let Some(next) = self.nodes[idx.index()].route(sample) {
            idx = next;
        }
        idx
    }
}
