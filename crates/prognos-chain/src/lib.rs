//! Classifier-chain risk stratification.
//!
//! An ordered set of binary classifiers scores one patient; each stage's
//! probability becomes an input feature of every later stage. Every stage
//! reports its probability, a risk tier, and its most influential features,
//! and the aggregator picks the patient's primary condition.

mod aggregate;
mod attribution;
mod bundle;
mod chain;
mod config;
mod error;
mod estimator;
mod result;
mod schema;
mod target;
mod tier;
mod train;

pub use aggregate::aggregate;
pub use attribution::top_k_factors;
pub use bundle::{ChainArtifact, ModelBundle, StageArtifact};
pub use chain::{ClassifierChain, Stage, StageRun};
pub use config::{ChainConfig, DEFAULT_TOP_K};
pub use error::ChainError;
pub use estimator::{Attribution, EstimatorError, ForestEstimator, RiskClassifier, RiskExplainer};
pub use result::{StageResult, StratificationResult};
pub use schema::{FeatureSchema, FeatureVector};
pub use target::ConditionTarget;
pub use tier::{RiskTier, TierThresholds};
pub use train::{ChainTraining, LabelColumn, StageTrainingSummary, train_chain};
