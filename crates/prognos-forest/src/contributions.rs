//! Per-sample feature contributions along decision paths.
//!
//! Each split on a sample's path moves the node value from the parent to the
//! child; that delta is credited to the split feature. Summed over the path
//! and averaged over trees, the credits plus the root value (the bias)
//! reproduce the forest's prediction exactly.

use crate::error::ForestError;
use crate::forest::RandomForest;
use crate::node::Node;

/// Decomposition of one prediction into a bias and per-feature credits.
#[derive(Debug, Clone)]
pub struct Contributions {
    /// Mean root value across trees (the prediction before any split).
    pub bias: f64,
    /// Per-feature contribution, in the forest's feature column order.
    pub values: Vec<f64>,
}

impl Contributions {
    /// Return `bias + Σ values`, which equals the explained prediction.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.bias + self.values.iter().sum::<f64>()
    }
}

impl RandomForest {
    /// Decompose the prediction for `output` on `sample`.
    ///
    /// For a classifier `output` is the class whose probability is explained;
    /// a regressor has the single output 0.
    ///
    /// # Errors
    ///
    /// | Variant                                    | When                                 |
    /// |--------------------------------------------|--------------------------------------|
    /// | [`ForestError::OutputOutOfRange`]          | `output` exceeds the output width    |
    /// | [`ForestError::PredictionFeatureMismatch`] | `sample.len() != n_features`         |
    pub fn contributions(&self, sample: &[f64], output: usize) -> Result<Contributions, ForestError> {
        let n_outputs = self.task.n_outputs();
        if output >= n_outputs {
            return Err(ForestError::OutputOutOfRange { output, n_outputs });
        }

        let mut bias = 0.0f64;
        let mut values = vec![0.0f64; self.n_features];
        for tree in &self.trees {
            let path = tree.decision_path(sample)?;
            bias += path[0].value()[output];
            for pair in path.windows(2) {
                if let Node::Split { feature, value, .. } = pair[0] {
                    values[feature.index()] += pair[1].value()[output] - value[output];
                }
            }
        }

        let n = self.trees.len() as f64;
        values.iter_mut().for_each(|v| *v /= n);
        Ok(Contributions {
            bias: bias / n,
            values,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{MaxFeatures, RandomForestConfig};
    use crate::ForestError;

    fn data() -> (Vec<Vec<f64>>, Vec<usize>, Vec<String>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            let x = f64::from(i);
            let noise = f64::from(i % 7);
            features.push(vec![x, noise]);
            labels.push(usize::from(i >= 20));
        }
        (features, labels, vec!["signal".to_string(), "noise".to_string()])
    }

    #[test]
    fn bias_plus_contributions_equals_probability() {
        let (features, labels, names) = data();
        let forest = RandomForestConfig::new(15)
            .unwrap()
            .fit_classifier(&features, &labels, &names)
            .unwrap()
            .into_forest();
        for sample in [vec![3.0, 2.0], vec![25.0, 5.0], vec![19.5, 1.0]] {
            let contrib = forest.contributions(&sample, 1).unwrap();
            let p = forest.positive_probability(&sample).unwrap();
            assert!((contrib.total() - p).abs() < 1e-9, "{} vs {p}", contrib.total());
        }
    }

    #[test]
    fn informative_feature_dominates() {
        let (features, labels, names) = data();
        let forest = RandomForestConfig::new(15)
            .unwrap()
            .with_max_features(MaxFeatures::All)
            .fit_classifier(&features, &labels, &names)
            .unwrap()
            .into_forest();
        let contrib = forest.contributions(&[35.0, 3.0], 1).unwrap();
        assert!(contrib.values[0] > 0.0);
        assert!(contrib.values[0].abs() > contrib.values[1].abs());
    }

    #[test]
    fn regressor_contributions_sum_to_prediction() {
        let features: Vec<Vec<f64>> = (0..30).map(|i| vec![f64::from(i), 1.0]).collect();
        let values: Vec<f64> = (0..30).map(|i| f64::from(i) * 10.0).collect();
        let forest = RandomForestConfig::new(8)
            .unwrap()
            .with_max_features(MaxFeatures::All)
            .fit_regressor(&features, &values, &["a".to_string(), "b".to_string()])
            .unwrap()
            .into_forest();
        let contrib = forest.contributions(&[12.0, 1.0], 0).unwrap();
        let pred = forest.predict_value(&[12.0, 1.0]).unwrap();
        assert!((contrib.total() - pred).abs() < 1e-6);
    }

    #[test]
    fn output_out_of_range() {
        let (features, labels, names) = data();
        let forest = RandomForestConfig::new(2)
            .unwrap()
            .fit_classifier(&features, &labels, &names)
            .unwrap()
            .into_forest();
        let err = forest.contributions(&[1.0, 1.0], 2).unwrap_err();
        assert!(matches!(err, ForestError::OutputOutOfRange { output: 2, n_outputs: 2 }));
    }
}
