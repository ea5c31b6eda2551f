//! Structural checks for forests that did not come straight out of training.
//!
//! A forest decoded from an artifact is only as sound as the bytes it came
//! from. Prediction indexes node arenas and sample slices without further
//! checks, so anything loaded from disk goes through [`RandomForest::validate`]
//! before it serves a request.

use crate::error::ForestError;
use crate::forest::{ForestTask, RandomForest};
use crate::node::Node;
use crate::tree::DecisionTree;

fn malformed(reason: String) -> ForestError {
    ForestError::MalformedModel { reason }
}

impl RandomForest {
    /// Check that every tree can be traversed for any sample of width
    /// [`RandomForest::n_features`].
    ///
    /// Children must sit after their parent in the arena, as training lays
    /// them out, which also rules out cycles.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::MalformedModel`] when the forest has no trees,
    /// its feature names do not match its width, a classifier models fewer
    /// than two classes, or any tree is inconsistent (see above).
    pub fn validate(&self) -> Result<(), ForestError> {
        if self.trees.is_empty() {
            return Err(malformed("forest has no trees".to_string()));
        }
        if self.n_features == 0 {
            return Err(malformed("forest has zero features".to_string()));
        }
        if self.feature_names.len() != self.n_features {
            return Err(malformed(format!(
                "{} feature names for {} features",
                self.feature_names.len(),
                self.n_features
            )));
        }
        if let ForestTask::Classifier { n_classes } = self.task
            && n_classes < 2
        {
            return Err(malformed(format!("classifier with {n_classes} classes")));
        }

        let n_outputs = self.task.n_outputs();
        for (tree_index, tree) in self.trees.iter().enumerate() {
            validate_tree(tree, self.n_features, n_outputs)
                .map_err(|reason| malformed(format!("tree {tree_index}: {reason}")))?;
        }
        Ok(())
    }
}

fn validate_tree(tree: &DecisionTree, n_features: usize, n_outputs: usize) -> Result<(), String> {
    if tree.nodes.is_empty() {
        return Err("no nodes".to_string());
    }
    if tree.n_features != n_features {
        return Err(format!(
            "fitted on {} features, forest has {n_features}",
            tree.n_features
        ));
    }
    if tree.n_outputs != n_outputs {
        return Err(format!(
            "{} outputs, forest has {n_outputs}",
            tree.n_outputs
        ));
    }

    let n_nodes = tree.nodes.len();
    for (index, node) in tree.nodes.iter().enumerate() {
        let value = node.value();
        if value.len() != n_outputs {
            return Err(format!(
                "node {index} holds {} values, expected {n_outputs}",
                value.len()
            ));
        }
        if value.iter().any(|v| !v.is_finite()) {
            return Err(format!("node {index} holds a non-finite value"));
        }
        if let Node::Split {
            feature,
            left,
            right,
            ..
        } = node
        {
            if feature.index() >= n_features {
                return Err(format!(
                    "node {index} splits on feature {}, width is {n_features}",
                    feature.index()
                ));
            }
            for child in [left, right] {
                if child.index() <= index || child.index() >= n_nodes {
                    return Err(format!(
                        "node {index} points to child {} outside ({index}, {n_nodes})",
                        child.index()
                    ));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::ForestError;
    use crate::config::{MaxFeatures, RandomForestConfig};
    use crate::forest::{ForestTask, RandomForest};
    use crate::node::{FeatureIndex, Node, NodeIndex};

    fn classifier() -> RandomForest {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            let x = f64::from(i);
            features.push(vec![x, (i % 3) as f64]);
            labels.push(usize::from(i >= 20));
        }
        RandomForestConfig::new(4)
            .unwrap()
            .with_max_features(MaxFeatures::All)
            .with_seed(3)
            .fit_classifier(&features, &labels, &["x".to_string(), "y".to_string()])
            .unwrap()
            .into_forest()
    }

    fn root_split(forest: &mut RandomForest) -> &mut Node {
        let root = &mut forest.trees[0].nodes[0];
        assert!(!root.is_leaf(), "fixture root should split");
        root
    }

    fn reason(err: ForestError) -> String {
        match err {
            ForestError::MalformedModel { reason } => reason,
            other => panic!("expected MalformedModel, got {other:?}"),
        }
    }

    #[test]
    fn trained_forest_is_valid() {
        classifier().validate().unwrap();
    }

    #[test]
    fn empty_forest_rejected() {
        let mut forest = classifier();
        forest.trees.clear();
        assert!(reason(forest.validate().unwrap_err()).contains("no trees"));
    }

    #[test]
    fn feature_name_count_must_match_width() {
        let mut forest = classifier();
        forest.feature_names.pop();
        assert!(reason(forest.validate().unwrap_err()).contains("feature names"));
    }

    #[test]
    fn single_class_classifier_rejected() {
        let mut forest = classifier();
        forest.task = ForestTask::Classifier { n_classes: 1 };
        assert!(reason(forest.validate().unwrap_err()).contains("1 classes"));
    }

    #[test]
    fn split_feature_beyond_width_rejected() {
        let mut forest = classifier();
        if let Node::Split { feature, .. } = root_split(&mut forest) {
            *feature = FeatureIndex::new(7);
        }
        let reason = reason(forest.validate().unwrap_err());
        assert!(reason.starts_with("tree 0: node 0 splits on feature 7"), "{reason}");
    }

    #[test]
    fn dangling_child_rejected() {
        let mut forest = classifier();
        let n_nodes = forest.trees[0].nodes.len();
        if let Node::Split { right, .. } = root_split(&mut forest) {
            *right = NodeIndex::new(n_nodes);
        }
        assert!(reason(forest.validate().unwrap_err()).contains("points to child"));
    }

    #[test]
    fn child_pointing_back_rejected() {
        let mut forest = classifier();
        if let Node::Split { left, .. } = root_split(&mut forest) {
            *left = NodeIndex::ROOT;
        }
        assert!(reason(forest.validate().unwrap_err()).contains("points to child 0"));
    }

    #[test]
    fn node_value_width_must_match_outputs() {
        let mut forest = classifier();
        if let Node::Split { value, .. } = root_split(&mut forest) {
            value.push(0.0);
        }
        assert!(reason(forest.validate().unwrap_err()).contains("holds 3 values"));
    }

    #[test]
    fn non_finite_node_value_rejected() {
        let mut forest = classifier();
        if let Node::Split { value, .. } = root_split(&mut forest) {
            value[0] = f64::NAN;
        }
        assert!(reason(forest.validate().unwrap_err()).contains("non-finite"));
    }

    #[test]
    fn tree_without_nodes_rejected() {
        let mut forest = classifier();
        forest.trees[1].nodes.clear();
        assert!(reason(forest.validate().unwrap_err()).starts_with("tree 1: no nodes"));
    }

    #[test]
    fn tree_width_must_match_forest() {
        let mut forest = classifier();
        forest.trees[2].n_features = 5;
        assert!(reason(forest.validate().unwrap_err()).contains("fitted on 5 features"));
    }
}
