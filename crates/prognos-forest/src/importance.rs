//! Mean-decrease-in-impurity importance aggregated across trees.

/// One feature's share of the forest's total impurity decrease.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RankedFeature {
    /// Feature name.
    pub name: String,
    /// Normalized importance score (sums to 1.0 across all features).
    pub importance: f64,
    /// 1-based rank (1 = most important).
    pub rank: usize,
}

/// Pool per-tree MDI vectors into one ranking whose scores sum to 1.0.
///
/// Ties keep column order. An all-zero pool (every tree a single leaf)
/// stays all zero.
pub(crate) fn aggregate_importances(
    per_tree: &[Vec<f64>],
    names: &[String],
) -> Vec<RankedFeature> {
    if per_tree.is_empty() || names.is_empty() {
        return vec![];
    }

    let pooled = per_tree.iter().fold(vec![0.0f64; names.len()], |mut acc, tree| {
        acc.iter_mut().zip(tree).for_each(|(a, v)| *a += v);
        acc
    });
    let total: f64 = pooled.iter().sum();
    let scale = if total > 0.0 { total.recip() } else { 0.0 };

    let mut order: Vec<usize> = (0..names.len()).collect();
    order.sort_by(|&a, &b| pooled[b].total_cmp(&pooled[a]));
    order
        .into_iter()
        .enumerate()
        .map(|(position, column)| RankedFeature {
            name: names[column].clone(),
            importance: pooled[column] * scale,
            rank: position + 1,
        })
        .collect()
}
