//! Arena node types shared by tree training, prediction, and attribution.

/// Column of the feature matrix a split tests.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct FeatureIndex(usize);

impl FeatureIndex {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Column position.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Position of a node in its tree's arena. The root is always 0.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct NodeIndex(usize);

impl NodeIndex {
    pub(crate) const ROOT: Self = Self(0);

    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Arena position.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Node impurity under the tree's criterion: Gini or entropy for
/// classification, variance for regression.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, serde::Serialize, serde::Deserialize)]
pub struct Impurity(f64);

impl Impurity {
    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Raw impurity.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

/// One node of a fitted tree.
///
/// Both variants keep `value`, the mean target over the training samples
/// that reached the node: a class distribution for classifiers, `[mean]`
/// for regressors. Keeping it on split nodes is what lets a prediction be
/// broken down into per-feature contributions along its decision path.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Node {
    /// Interior node routing on one feature.
    Split {
        /// Feature tested.
        feature: FeatureIndex,
        /// Samples with `feature <= threshold` go left.
        threshold: f64,
        /// Left child.
        left: NodeIndex,
        /// Right child.
        right: NodeIndex,
        /// Impurity before the split.
        impurity: Impurity,
        /// Training samples that reached this node.
        n_samples: usize,
        /// Sample-weighted impurity decrease of the split.
        impurity_decrease: f64,
        /// Mean target at this node.
        value: Vec<f64>,
    },
    /// Terminal node.
    Leaf {
        /// Mean target at this leaf.
        value: Vec<f64>,
        /// Impurity at this leaf.
        impurity: Impurity,
        /// Training samples that reached this leaf.
        n_samples: usize,
    },
}

impl Node {
    /// Child that `sample` descends into, or `None` at a leaf.
    #[must_use]
    pub fn route(&self, sample: &[f64]) -> Option<NodeIndex> {
        match self {
            Node::Leaf { .. } => None,
            Node::Split {
                feature,
                threshold,
                left,
                right,
                ..
            } => Some(if sample[feature.index()] <= *threshold {
                *left
            } else {
                *right
            }),
        }
    }

    /// Training samples that reached this node.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        match self {
            Node::Split { n_samples, .. } | Node::Leaf { n_samples, .. } => *n_samples,
        }
    }

    /// Mean target at this node.
    #[must_use]
    pub fn value(&self) -> &[f64] {
        match self {
            Node::Split { value, .. } | Node::Leaf { value, .. } => value,
        }
    }

    /// `true` for terminal nodes.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }
}
