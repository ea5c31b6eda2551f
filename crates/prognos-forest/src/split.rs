use rand::Rng;

use crate::node::{FeatureIndex, Impurity};

/// Criterion for measuring the quality of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SplitCriterion {
    /// Gini impurity: 1 - Σ(p_i²)
    Gini,
    /// Information entropy: -Σ(p_i · ln(p_i))
    Entropy,
    /// Variance of the regression target (mean squared error around the node mean).
    SquaredError,
}

impl SplitCriterion {
    /// Return `true` when the criterion applies to class labels.
    #[must_use]
    pub fn is_classification(self) -> bool {
        matches!(self, SplitCriterion::Gini | SplitCriterion::Entropy)
    }

    /// Compute the impurity of a node from its class counts.
    ///
    /// Returns [`Impurity::new(0.0)`] when `n_samples` is zero (pure node).
    /// `SquaredError` over one-hot class indicators equals the Gini index, so it
    /// is evaluated as Gini here.
    #[must_use]
    pub fn impurity(&self, class_counts: &[usize], n_samples: usize) -> Impurity {
        if n_samples == 0 {
            return Impurity::new(0.0);
        }
        let n = n_samples as f64;
        let value = match self {
            SplitCriterion::Gini | SplitCriterion::SquaredError => {
                let sum_sq: f64 = class_counts
                    .iter()
                    .map(|&c| {
                        let p = c as f64 / n;
                        p * p
                    })
                    .sum();
                1.0 - sum_sq
            }
            SplitCriterion::Entropy => {
                -class_counts
                    .iter()
                    .filter(|&&c| c > 0)
                    .map(|&c| {
                        let p = c as f64 / n;
                        p * p.ln()
                    })
                    .sum::<f64>()
            }
        };
        Impurity::new(value)
    }
}

/// Strategy for choosing split thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SplitMethod {
    /// Scan every boundary between sorted distinct values (CART).
    Exact,
    /// Draw one uniform threshold per candidate feature (Extremely Randomized Trees).
    ExtraTrees,
}

/// Training targets for one tree.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Target<'a> {
    /// Zero-based class labels with a fixed class count.
    Classes {
        labels: &'a [usize],
        n_classes: usize,
    },
    /// Continuous regression values.
    Values(&'a [f64]),
}

impl Target<'_> {
    pub(crate) fn len(&self) -> usize {
        match self {
            Target::Classes { labels, .. } => labels.len(),
            Target::Values(values) => values.len(),
        }
    }

    /// Width of the node value vector.
    pub(crate) fn n_outputs(&self) -> usize {
        match self {
            Target::Classes { n_classes, .. } => *n_classes,
            Target::Values(_) => 1,
        }
    }
}

/// Sufficient statistics of the samples reaching a node.
#[derive(Debug, Clone)]
pub(crate) enum NodeStats {
    Classes { counts: Vec<usize>, n: usize },
    Moments { n: usize, sum: f64, sum_sq: f64 },
}

impl NodeStats {
    pub(crate) fn empty(target: Target<'_>) -> Self {
        match target {
            Target::Classes { n_classes, .. } => NodeStats::Classes {
                counts: vec![0; n_classes],
                n: 0,
            },
            Target::Values(_) => NodeStats::Moments {
                n: 0,
                sum: 0.0,
                sum_sq: 0.0,
            },
        }
    }

    pub(crate) fn from_samples(target: Target<'_>, sample_indices: &[usize]) -> Self {
        let mut stats = Self::empty(target);
        for &si in sample_indices {
            stats.add(target, si);
        }
        stats
    }

    pub(crate) fn add(&mut self, target: Target<'_>, sample: usize) {
        match (self, target) {
            (NodeStats::Classes { counts, n }, Target::Classes { labels, .. }) => {
                counts[labels[sample]] += 1;
                *n += 1;
            }
            (NodeStats::Moments { n, sum, sum_sq }, Target::Values(values)) => {
                let y = values[sample];
                *n += 1;
                *sum += y;
                *sum_sq += y * y;
            }
            _ => unreachable!("node statistics always match their target kind"),
        }
    }

    pub(crate) fn remove(&mut self, target: Target<'_>, sample: usize) {
        match (self, target) {
            (NodeStats::Classes { counts, n }, Target::Classes { labels, .. }) => {
                counts[labels[sample]] -= 1;
                *n -= 1;
            }
            (NodeStats::Moments { n, sum, sum_sq }, Target::Values(values)) => {
                let y = values[sample];
                *n -= 1;
                *sum -= y;
                *sum_sq -= y * y;
            }
            _ => unreachable!("node statistics always match their target kind"),
        }
    }

    pub(crate) fn n(&self) -> usize {
        match self {
            NodeStats::Classes { n, .. } | NodeStats::Moments { n, .. } => *n,
        }
    }

    pub(crate) fn impurity(&self, criterion: SplitCriterion) -> Impurity {
        match self {
            NodeStats::Classes { counts, n } => criterion.impurity(counts, *n),
            NodeStats::Moments { n, sum, sum_sq } => {
                if *n == 0 {
                    return Impurity::new(0.0);
                }
                let n = *n as f64;
                let mean = sum / n;
                // Incremental sums can drift slightly negative on constant targets.
                Impurity::new((sum_sq / n - mean * mean).max(0.0))
            }
        }
    }

    /// Node value: class distribution or `[mean]`.
    pub(crate) fn value(&self) -> Vec<f64> {
        match self {
            NodeStats::Classes { counts, n } => {
                let total = (*n).max(1) as f64;
                counts.iter().map(|&c| c as f64 / total).collect()
            }
            NodeStats::Moments { n, sum, .. } => vec![sum / (*n).max(1) as f64],
        }
    }
}

/// Result of finding the best split for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    /// Feature used for the split.
    pub(crate) feature: FeatureIndex,
    /// Threshold value.
    pub(crate) threshold: f64,
    /// Weighted impurity decrease from this split (MDI formula).
    pub(crate) impurity_decrease: f64,
    /// Sample indices going to the left child.
    pub(crate) left_indices: Vec<usize>,
    /// Sample indices going to the right child.
    pub(crate) right_indices: Vec<usize>,
}

/// Parameters shared by every split search within one tree.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SplitParams {
    pub(crate) criterion: SplitCriterion,
    pub(crate) method: SplitMethod,
    pub(crate) max_features: usize,
    pub(crate) min_samples_leaf: usize,
}

/// Weighted impurity decrease of splitting `parent` into `left` and `right`.
fn weighted_decrease(
    criterion: SplitCriterion,
    parent: &NodeStats,
    left: &NodeStats,
    right: &NodeStats,
) -> f64 {
    (parent.n() as f64) * parent.impurity(criterion).value()
        - (left.n() as f64) * left.impurity(criterion).value()
        - (right.n() as f64) * right.impurity(criterion).value()
}

/// Find the best split among a random subset of features.
///
/// `features` is column-major: `features[feature_idx][sample_idx]`, and
/// `sample_indices` index into the inner vectors. Up to `max_features`
/// features are drawn with a partial Fisher-Yates shuffle, then each is
/// scanned (exact) or cut once at a random threshold (extra-trees).
///
/// Returns `None` when no valid split exists (all candidate values identical,
/// or every boundary would violate `min_samples_leaf`).
pub(crate) fn find_best_split(
    features: &[Vec<f64>],
    target: Target<'_>,
    sample_indices: &[usize],
    params: SplitParams,
    rng: &mut impl Rng,
) -> Option<SplitResult> {
    let n_features = features.len();
    let n_samples = sample_indices.len();

    if n_samples < 2 || n_features == 0 {
        return None;
    }

    let parent = NodeStats::from_samples(target, sample_indices);

    let mut feature_order: Vec<usize> = (0..n_features).collect();
    let take = params.max_features.min(n_features);
    for i in 0..take {
        let j = rng.gen_range(i..n_features);
        feature_order.swap(i, j);
    }

    let mut best_decrease = f64::NEG_INFINITY;
    let mut best: Option<(FeatureIndex, f64)> = None;

    for &feat_idx in &feature_order[..take] {
        let feat_col = &features[feat_idx];
        let candidate = match params.method {
            SplitMethod::Exact => {
                exact_candidate(feat_col, target, sample_indices, &parent, params)
            }
            SplitMethod::ExtraTrees => {
                random_candidate(feat_col, target, sample_indices, &parent, params, rng)
            }
        };
        if let Some((threshold, decrease)) = candidate
            && decrease > best_decrease
        {
            best_decrease = decrease;
            best = Some((FeatureIndex::new(feat_idx), threshold));
        }
    }

    let (feature, threshold) = best?;
    let (left_indices, right_indices) =
        partition(&features[feature.index()], sample_indices, threshold);

    Some(SplitResult {
        feature,
        threshold,
        impurity_decrease: best_decrease,
        left_indices,
        right_indices,
    })
}

fn partition(feat_col: &[f64], sample_indices: &[usize], threshold: f64) -> (Vec<usize>, Vec<usize>) {
    sample_indices
        .iter()
        .copied()
        .partition(|&si| feat_col[si] <= threshold)
}

/// Best boundary for one feature: sort, then move samples left one at a time.
fn exact_candidate(
    feat_col: &[f64],
    target: Target<'_>,
    sample_indices: &[usize],
    parent: &NodeStats,
    params: SplitParams,
) -> Option<(f64, f64)> {
    let n_samples = sample_indices.len();
    let mut sorted: Vec<(f64, usize)> = sample_indices
        .iter()
        .map(|&si| (feat_col[si], si))
        .collect();
    sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

    let mut left = NodeStats::empty(target);
    let mut right = parent.clone();
    let mut best: Option<(f64, f64)> = None;

    for i in 0..(n_samples - 1) {
        let (val_i, si) = sorted[i];
        left.add(target, si);
        right.remove(target, si);

        let val_next = sorted[i + 1].0;
        if val_i == val_next {
            continue;
        }
        if left.n() < params.min_samples_leaf || right.n() < params.min_samples_leaf {
            continue;
        }

        let decrease = weighted_decrease(params.criterion, parent, &left, &right);
        if best.is_none_or(|(_, d)| decrease > d) {
            best = Some(((val_i + val_next) / 2.0, decrease));
        }
    }
    best
}

/// One uniform threshold between the node's min and max for this feature.
fn random_candidate(
    feat_col: &[f64],
    target: Target<'_>,
    sample_indices: &[usize],
    parent: &NodeStats,
    params: SplitParams,
    rng: &mut impl Rng,
) -> Option<(f64, f64)> {
    let (lo, hi) = sample_indices.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY),
        |(lo, hi), &si| (lo.min(feat_col[si]), hi.max(feat_col[si])),
    );
    if lo >= hi {
        return None;
    }

    let mut threshold = rng.gen_range(lo..hi);
    // A draw on the maximum would leave the right child empty.
    if threshold >= hi {
        threshold = lo;
    }

    let mut left = NodeStats::empty(target);
    let mut right = NodeStats::empty(target);
    for &si in sample_indices {
        if feat_col[si] <= threshold {
            left.add(target, si);
        } else {
            right.add(target, si);
        }
    }
    if left.n() < params.min_samples_leaf || right.n() < params.min_samples_leaf {
        return None;
    }
    Some((threshold, weighted_decrease(params.criterion, parent, &left, &right)))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn params(method: SplitMethod, criterion: SplitCriterion, min_samples_leaf: usize) -> SplitParams {
        SplitParams {
            criterion,
            method,
            max_features: 1,
            min_samples_leaf,
        }
    }

    #[test]
    fn gini_binary_balanced() {
        let imp = SplitCriterion::Gini.impurity(&[5, 5], 10);
        assert!((imp.value() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn entropy_binary_balanced() {
        let imp = SplitCriterion::Entropy.impurity(&[5, 5], 10);
        assert!((imp.value() - 2.0_f64.ln()).abs() < 1e-10);
    }

    #[test]
    fn moments_variance_and_mean() {
        let values = [1.0, 2.0, 3.0, 4.0];
        let stats = NodeStats::from_samples(Target::Values(&values), &[0, 1, 2, 3]);
        assert!((stats.impurity(SplitCriterion::SquaredError).value() - 1.25).abs() < 1e-12);
        assert_eq!(stats.value(), vec![2.5]);
    }

    #[test]
    fn class_stats_value_is_distribution() {
        let labels = [0, 1, 1, 1];
        let target = Target::Classes { labels: &labels, n_classes: 2 };
        let stats = NodeStats::from_samples(target, &[0, 1, 2, 3]);
        assert_eq!(stats.value(), vec![0.25, 0.75]);
    }

    #[test]
    fn separable_labels_find_correct_split() {
        let features = vec![vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0]];
        let labels = vec![0, 0, 0, 1, 1, 1];
        let target = Target::Classes { labels: &labels, n_classes: 2 };
        let indices: Vec<usize> = (0..6).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let split = find_best_split(
            &features,
            target,
            &indices,
            params(SplitMethod::Exact, SplitCriterion::Gini, 1),
            &mut rng,
        )
        .expect("should find a split");
        assert_eq!(split.feature.index(), 0);
        assert!(split.threshold > 3.0 && split.threshold < 10.0);
        assert_eq!(split.left_indices, vec![0, 1, 2]);
        assert_eq!(split.right_indices, vec![3, 4, 5]);
    }

    #[test]
    fn regression_split_separates_levels() {
        let features = vec![vec![1.0, 2.0, 3.0, 4.0]];
        let values = vec![10.0, 10.0, 50.0, 50.0];
        let indices: Vec<usize> = (0..4).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let split = find_best_split(
            &features,
            Target::Values(&values),
            &indices,
            params(SplitMethod::Exact, SplitCriterion::SquaredError, 1),
            &mut rng,
        )
        .expect("should find a split");
        assert!((split.threshold - 2.5).abs() < 1e-12);
    }

    #[test]
    fn constant_feature_returns_none() {
        let features = vec![vec![5.0, 5.0, 5.0, 5.0]];
        let labels = vec![0, 0, 1, 1];
        let target = Target::Classes { labels: &labels, n_classes: 2 };
        let indices: Vec<usize> = (0..4).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        for method in [SplitMethod::Exact, SplitMethod::ExtraTrees] {
            let result = find_best_split(
                &features,
                target,
                &indices,
                params(method, SplitCriterion::Gini, 1),
                &mut rng,
            );
            assert!(result.is_none());
        }
    }

    #[test]
    fn min_samples_leaf_enforced() {
        let features = vec![vec![1.0, 10.0]];
        let labels = vec![0, 1];
        let target = Target::Classes { labels: &labels, n_classes: 2 };
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let result = find_best_split(
            &features,
            target,
            &[0, 1],
            params(SplitMethod::Exact, SplitCriterion::Gini, 2),
            &mut rng,
        );
        assert!(result.is_none());
    }

    #[test]
    fn extra_trees_threshold_inside_range() {
        let features = vec![vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0]];
        let labels = vec![0, 0, 0, 1, 1, 1];
        let target = Target::Classes { labels: &labels, n_classes: 2 };
        let indices: Vec<usize> = (0..6).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let split = find_best_split(
            &features,
            target,
            &indices,
            params(SplitMethod::ExtraTrees, SplitCriterion::Gini, 1),
            &mut rng,
        )
        .expect("non-constant feature always yields a cut");
        assert!(split.threshold >= 1.0 && split.threshold < 12.0);
        assert!(!split.left_indices.is_empty() && !split.right_indices.is_empty());
    }
}
