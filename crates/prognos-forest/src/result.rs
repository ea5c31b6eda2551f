//! What a training run hands back besides the forest itself.

use crate::forest::RandomForest;
use crate::importance::RankedFeature;

/// Shape of a fitted forest and the data it saw.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TrainingMetadata {
    /// Trees in the forest.
    pub n_trees: usize,
    /// Input columns.
    pub n_features: usize,
    /// Training rows.
    pub n_samples: usize,
    /// Candidate features drawn per split.
    pub max_features_resolved: usize,
    /// Mean tree depth; a lone leaf has depth 0.
    pub mean_depth: f64,
    /// Mean node count per tree.
    pub mean_nodes: f64,
}

/// A fitted forest with its MDI ranking and [`TrainingMetadata`].
#[derive(Debug)]
pub struct RandomForestResult {
    forest: RandomForest,
    importances: Vec<RankedFeature>,
    metadata: TrainingMetadata,
}

impl RandomForestResult {
    pub(crate) fn new(
        forest: RandomForest,
        importances: Vec<RankedFeature>,
        metadata: TrainingMetadata,
    ) -> Self {
        Self { forest, importances, metadata }
    }

    /// The fitted forest.
    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Take the fitted forest, dropping the rest.
    #[must_use]
    pub fn into_forest(self) -> RandomForest {
        self.forest
    }

    /// Features by descending importance.
    #[must_use]
    pub fn importances(&self) -> &[RankedFeature] {
        &self.importances
    }

    /// Shape of the run.
    #[must_use]
    pub fn metadata(&self) -> &TrainingMetadata {
        &self.metadata
    }
}
