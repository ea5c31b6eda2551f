//! Persisted chain models and the start-up bundle built from them.

use std::collections::BTreeMap;
use std::path::Path;

use prognos_forest::{RandomForest, read_artifact, write_artifact};
use tracing::{info, instrument};

use crate::chain::{ClassifierChain, Stage};
use crate::config::ChainConfig;
use crate::error::ChainError;
use crate::estimator::ForestEstimator;
use crate::result::StratificationResult;
use crate::schema::FeatureSchema;
use crate::target::ConditionTarget;

/// Artifact kind tag for a stored chain.
const CHAIN_KIND: &str = "classifier-chain";

/// One stored stage: its target and fitted forest.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StageArtifact {
    /// Outcome the forest predicts.
    pub target: ConditionTarget,
    /// Binary classification forest.
    pub forest: RandomForest,
}

/// Everything needed to rebuild a chain: schema plus ordered stages.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ChainArtifact {
    /// Training columns.
    pub schema: FeatureSchema,
    /// Stages in execution order.
    pub stages: Vec<StageArtifact>,
}

impl ChainArtifact {
    /// Save the chain to a versioned binary file.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Artifact`] when encoding or writing fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ChainError> {
        write_artifact(path.as_ref(), CHAIN_KIND, self)?;
        Ok(())
    }

    /// Load a chain from a versioned binary file.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Artifact`] when the file is missing, corrupt,
    /// from another format version, or holds another kind of model.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ChainError> {
        Ok(read_artifact(path.as_ref(), CHAIN_KIND)?)
    }
}

/// Read-only models shared by every request.
///
/// Built once at start-up; any problem with the stored models surfaces here
/// rather than per request.
#[derive(Debug, Clone)]
pub struct ModelBundle {
    chain: ClassifierChain,
}

impl ModelBundle {
    /// Load and validate a stored chain.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Artifact`] for unreadable files and any error of
    /// [`ModelBundle::from_artifact`].
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>, config: ChainConfig) -> Result<Self, ChainError> {
        let artifact = ChainArtifact::load(path)?;
        Self::from_artifact(artifact, config)
    }

    /// Build a bundle from an in-memory artifact.
    ///
    /// # Errors
    ///
    /// | Variant                             | When                                      |
    /// |-------------------------------------|-------------------------------------------|
    /// | [`ChainError::InvalidStageModel`]   | a stored forest is malformed or a regressor |
    /// | any [`ClassifierChain::new`] error  | stages are empty, duplicated, or mis-wired |
    pub fn from_artifact(artifact: ChainArtifact, config: ChainConfig) -> Result<Self, ChainError> {
        let stages = artifact
            .stages
            .into_iter()
            .map(|stage| {
                let estimator = ForestEstimator::new(stage.forest).map_err(|source| {
                    ChainError::InvalidStageModel {
                        target: stage.target.label().to_string(),
                        source,
                    }
                })?;
                Ok(Stage::from_estimator(stage.target, estimator))
            })
            .collect::<Result<Vec<_>, ChainError>>()?;

        let chain = ClassifierChain::new(artifact.schema, stages, config)?;
        info!(
            targets = ?chain.targets().map(ConditionTarget::label).collect::<Vec<_>>(),
            "model bundle loaded"
        );
        Ok(Self { chain })
    }

    /// Borrow the chain.
    #[must_use]
    pub fn chain(&self) -> &ClassifierChain {
        &self.chain
    }

    /// Stratify one patient from raw (unaligned) features.
    ///
    /// # Errors
    ///
    /// See [`ClassifierChain::run`].
    pub fn stratify(
        &self,
        patient_id: &str,
        age: Option<f64>,
        raw: &BTreeMap<String, f64>,
    ) -> Result<StratificationResult, ChainError> {
        self.chain.stratify(patient_id, age, raw)
    }
}
