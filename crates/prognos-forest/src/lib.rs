//! Random Forest classification and regression with decision-path explanations.
//!
//! Provides CART decision trees with Gini, entropy, and squared-error split
//! criteria, parallel ensemble training via rayon, mean-decrease-in-impurity
//! importances, per-sample feature contributions, and versioned bincode
//! artifacts.

mod config;
mod contributions;
mod error;
mod forest;
mod importance;
mod node;
mod predict;
mod result;
mod serialize;
mod split;
mod tree;
mod validate;

pub use config::{MaxFeatures, RandomForestConfig};
pub use contributions::Contributions;
pub use error::ForestError;
pub use forest::{ForestTask, RandomForest};
pub use importance::RankedFeature;
pub use node::{FeatureIndex, Impurity, Node, NodeIndex};
pub use predict::ClassDistribution;
pub use result::{RandomForestResult, TrainingMetadata};
pub use serialize::{FORMAT_VERSION, read_artifact, write_artifact};
pub use split::{SplitCriterion, SplitMethod};
pub use tree::{DecisionTree, DecisionTreeConfig};
