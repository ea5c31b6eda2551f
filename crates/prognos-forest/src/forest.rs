//! Random Forest training with parallel tree construction.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::config::RandomForestConfig;
use crate::error::ForestError;
use crate::importance::aggregate_importances;
use crate::result::{RandomForestResult, TrainingMetadata};
use crate::split::{SplitCriterion, Target};
use crate::tree::{DecisionTree, DecisionTreeConfig, validate_training_set};

/// What a fitted forest predicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ForestTask {
    /// Class probabilities over `n_classes` classes.
    Classifier {
        /// Number of modelled classes (at least 2).
        n_classes: usize,
    },
    /// A single continuous value.
    Regressor,
}

impl ForestTask {
    pub(crate) fn name(self) -> &'static str {
        match self {
            ForestTask::Classifier { .. } => "classifier",
            ForestTask::Regressor => "regressor",
        }
    }

    /// Width of every node value in the forest's trees.
    #[must_use]
    pub fn n_outputs(self) -> usize {
        match self {
            ForestTask::Classifier { n_classes } => n_classes,
            ForestTask::Regressor => 1,
        }
    }
}

/// A fitted Random Forest ensemble.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RandomForest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) n_features: usize,
    pub(crate) task: ForestTask,
    pub(crate) feature_names: Vec<String>,
}

/// Draw a bootstrap sample of `draw_count` indices with replacement.
fn bootstrap_sample(n_samples: usize, draw_count: usize, rng: &mut impl Rng) -> Vec<usize> {
    (0..draw_count).map(|_| rng.gen_range(0..n_samples)).collect()
}

/// Train the Random Forest ensemble.
#[instrument(skip_all, fields(n_trees = config.n_trees, n_samples = features.len()))]
pub(crate) fn train(
    config: &RandomForestConfig,
    criterion: SplitCriterion,
    features: &[Vec<f64>],
    target: Target<'_>,
    feature_names: &[String],
) -> Result<RandomForestResult, ForestError> {
    let n_features = validate_training_set(features, target)?;
    if feature_names.len() != n_features {
        return Err(ForestError::FeatureNameCountMismatch {
            n_features,
            names: feature_names.len(),
        });
    }

    let max_features_resolved = config.max_features.resolve(n_features)?;
    if config.bootstrap_fraction <= 0.0 || config.bootstrap_fraction > 1.0 {
        return Err(ForestError::InvalidBootstrapFraction {
            fraction: config.bootstrap_fraction,
        });
    }

    let n_samples = features.len();
    let draw_count = ((n_samples as f64) * config.bootstrap_fraction).ceil() as usize;
    let task = match target {
        Target::Classes { n_classes, .. } => ForestTask::Classifier { n_classes },
        Target::Values(_) => ForestTask::Regressor,
    };

    info!(
        n_trees = config.n_trees,
        n_samples,
        n_features,
        task = task.name(),
        max_features = max_features_resolved,
        draw_count,
        "training random forest"
    );

    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let tree_seeds: Vec<u64> = (0..config.n_trees).map(|_| master_rng.r#gen()).collect();

    let tree_config = DecisionTreeConfig::new()
        .with_criterion(criterion)
        .with_split_method(config.split_method)
        .with_max_depth(config.max_depth)
        .with_min_samples_split(config.min_samples_split)
        .with_min_samples_leaf(config.min_samples_leaf)
        .with_max_features(Some(max_features_resolved));

    let trees: Vec<DecisionTree> = tree_seeds
        .into_par_iter()
        .map(|seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let indices = bootstrap_sample(n_samples, draw_count, &mut rng);
            let boot_features: Vec<Vec<f64>> =
                indices.iter().map(|&i| features[i].clone()).collect();
            let tree_config = tree_config.clone().with_seed(rng.r#gen());

            match target {
                Target::Classes { labels, n_classes } => {
                    let boot_labels: Vec<usize> = indices.iter().map(|&i| labels[i]).collect();
                    tree_config.fit_target(
                        &boot_features,
                        Target::Classes {
                            labels: &boot_labels,
                            n_classes,
                        },
                    )
                }
                Target::Values(values) => {
                    let boot_values: Vec<f64> = indices.iter().map(|&i| values[i]).collect();
                    tree_config.fit_target(&boot_features, Target::Values(&boot_values))
                }
            }
        })
        .collect::<Result<_, _>>()?;

    let per_tree_importances: Vec<Vec<f64>> =
        trees.iter().map(DecisionTree::feature_importances).collect();
    let importances = aggregate_importances(&per_tree_importances, feature_names);

    debug!(n_trees_trained = trees.len(), "tree training complete");

    let forest = RandomForest {
        trees,
        n_features,
        task,
        feature_names: feature_names.to_vec(),
    };

    let n_built = forest.trees.len().max(1) as f64;
    let metadata = TrainingMetadata {
        n_trees: config.n_trees,
        n_features,
        n_samples,
        max_features_resolved,
        mean_depth: forest.trees.iter().map(DecisionTree::depth).sum::<usize>() as f64 / n_built,
        mean_nodes: forest.trees.iter().map(DecisionTree::n_nodes).sum::<usize>() as f64 / n_built,
    };

    info!(
        top_feature = importances.first().map(|f| f.name.as_str()),
        "random forest training complete"
    );

    Ok(RandomForestResult::new(forest, importances, metadata))
}
