//! Fitting one forest per chain stage.

use std::collections::HashSet;

use prognos_forest::{RandomForestConfig, RankedFeature, TrainingMetadata};
use tracing::{info, instrument};

use crate::bundle::{ChainArtifact, StageArtifact};
use crate::error::ChainError;
use crate::schema::FeatureSchema;
use crate::target::ConditionTarget;

/// Number of ranked features kept per stage in the training summary.
const SUMMARY_FEATURES: usize = 5;

/// Observed 0/1 labels for one target, aligned with the feature rows.
#[derive(Debug, Clone)]
pub struct LabelColumn {
    /// Outcome these labels describe.
    pub target: ConditionTarget,
    /// One label per training row.
    pub labels: Vec<usize>,
}

/// Training statistics for one stage.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StageTrainingSummary {
    /// Target label.
    pub target: String,
    /// Display name of the condition.
    pub condition: String,
    /// Number of training rows.
    pub n_samples: usize,
    /// Rows labelled positive.
    pub n_positive: usize,
    /// Number of input features, including propagated ones.
    pub n_features: usize,
    /// Highest-ranked features by mean decrease in impurity.
    pub top_features: Vec<RankedFeature>,
    /// Shape of the stage's forest.
    pub forest: TrainingMetadata,
}

/// Fitted chain plus per-stage summaries.
#[derive(Debug, Clone)]
pub struct ChainTraining {
    /// The artifact to persist.
    pub artifact: ChainArtifact,
    /// One summary per stage, in chain order.
    pub summaries: Vec<StageTrainingSummary>,
}

/// Fit a forest per target in chain order.
///
/// Stage *i* is trained on the schema columns followed by the observed labels
/// of targets `0..i`, named by their propagated features. At inference those
/// columns carry the earlier stages' predicted probabilities instead.
///
/// Each stage is seeded from `forest_config`'s seed offset by its position.
///
/// # Errors
///
/// | Variant                              | When                                           |
/// |--------------------------------------|------------------------------------------------|
/// | [`ChainError::EmptyChain`]           | `targets` is empty                             |
/// | [`ChainError::DuplicateTarget`]      | two columns share a target                     |
/// | [`ChainError::InvalidTrainingData`]  | label counts differ from rows, or non-0/1 labels |
/// | [`ChainError::Training`]             | a forest fails to fit                          |
#[instrument(skip_all, fields(n_samples = features.len(), n_targets = targets.len()))]
pub fn train_chain(
    schema: &FeatureSchema,
    features: &[Vec<f64>],
    targets: &[LabelColumn],
    forest_config: &RandomForestConfig,
) -> Result<ChainTraining, ChainError> {
    validate_targets(features.len(), targets)?;

    let mut rows = features.to_vec();
    let mut names = schema.names().to_vec();
    let mut stages = Vec::with_capacity(targets.len());
    let mut summaries = Vec::with_capacity(targets.len());

    for (position, column) in targets.iter().enumerate() {
        let config = forest_config
            .clone()
            .with_seed(forest_config.seed().wrapping_add(position as u64));
        let result = config
            .fit_classifier(&rows, &column.labels, &names)
            .map_err(|source| ChainError::Training {
                target: column.target.label().to_string(),
                source,
            })?;

        let n_positive = column.labels.iter().filter(|&&l| l == 1).count();
        info!(
            stage = position,
            condition = %column.target,
            n_positive,
            n_features = names.len(),
            "stage trained"
        );
        summaries.push(StageTrainingSummary {
            target: column.target.label().to_string(),
            condition: column.target.display_name(),
            n_samples: rows.len(),
            n_positive,
            n_features: names.len(),
            top_features: result.importances().iter().take(SUMMARY_FEATURES).cloned().collect(),
            forest: result.metadata().clone(),
        });
        stages.push(StageArtifact {
            target: column.target.clone(),
            forest: result.into_forest(),
        });

        if position + 1 < targets.len() {
            for (row, &label) in rows.iter_mut().zip(&column.labels) {
                row.push(label as f64);
            }
            names.push(column.target.propagated_feature());
        }
    }

    Ok(ChainTraining {
        artifact: ChainArtifact {
            schema: schema.clone(),
            stages,
        },
        summaries,
    })
}

fn validate_targets(n_samples: usize, targets: &[LabelColumn]) -> Result<(), ChainError> {
    if targets.is_empty() {
        return Err(ChainError::EmptyChain);
    }
    let mut seen = HashSet::with_capacity(targets.len());
    for column in targets {
        let label = column.target.label();
        if !seen.insert(label) {
            return Err(ChainError::DuplicateTarget {
                label: label.to_string(),
            });
        }
        if column.labels.len() != n_samples {
            return Err(ChainError::InvalidTrainingData {
                reason: format!(
                    "{label} has {} labels for {n_samples} rows",
                    column.labels.len()
                ),
            });
        }
        if let Some(bad) = column.labels.iter().find(|&&l| l > 1) {
            return Err(ChainError::InvalidTrainingData {
                reason: format!("{label} has non-binary label {bad}"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use prognos_forest::{MaxFeatures, RandomForestConfig};

    use super::*;

    fn column(label: &str, labels: Vec<usize>) -> LabelColumn {
        LabelColumn {
            target: ConditionTarget::new(label).unwrap(),
            labels,
        }
    }

    #[test]
    fn later_stages_see_earlier_targets() {
        let schema = FeatureSchema::new(vec!["x".into()]).unwrap();
        let features: Vec<Vec<f64>> = (0..20).map(|i| vec![f64::from(i)]).collect();
        let a: Vec<usize> = (0..20).map(|i| usize::from(i >= 10)).collect();
        let b = a.clone();
        let config = RandomForestConfig::new(3).unwrap().with_max_features(MaxFeatures::All);
        let trained = train_chain(
            &schema,
            &features,
            &[column("A", a), column("B", b)],
            &config,
        )
        .unwrap();
        assert_eq!(trained.artifact.stages[0].forest.feature_names(), &["x"]);
        assert_eq!(trained.artifact.stages[1].forest.feature_names(), &["x", "A_prob"]);
        assert_eq!(trained.summaries[1].n_positive, 10);
        assert_eq!(trained.summaries[1].forest.n_features, 2);
        assert_eq!(trained.summaries[0].forest.n_trees, 3);
    }

    #[test]
    fn label_count_mismatch_rejected() {
        let schema = FeatureSchema::new(vec!["x".into()]).unwrap();
        let config = RandomForestConfig::new(2).unwrap();
        let err = train_chain(&schema, &[vec![1.0], vec![2.0]], &[column("A", vec![0])], &config)
            .unwrap_err();
        assert!(matches!(err, ChainError::InvalidTrainingData { .. }));
    }

    #[test]
    fn non_binary_label_rejected() {
        let schema = FeatureSchema::new(vec!["x".into()]).unwrap();
        let config = RandomForestConfig::new(2).unwrap();
        let err = train_chain(&schema, &[vec![1.0]], &[column("A", vec![2])], &config).unwrap_err();
        assert!(matches!(err, ChainError::InvalidTrainingData { .. }));
    }

    #[test]
    fn no_targets_rejected() {
        let schema = FeatureSchema::new(vec!["x".into()]).unwrap();
        let config = RandomForestConfig::new(2).unwrap();
        assert!(matches!(
            train_chain(&schema, &[vec![1.0]], &[], &config),
            Err(ChainError::EmptyChain)
        ));
    }
}
