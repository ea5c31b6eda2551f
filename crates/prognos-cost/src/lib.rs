//! Proactive versus reactive cost estimation.
//!
//! Two regression forests price preventive management and emergency
//! treatment for each condition a stratification result names; the
//! difference is the potential saving from intervening early.

mod error;
mod metrics;
mod model;
mod observation;
mod roi;
mod schema;

pub use error::CostError;
pub use metrics::RegressionMetrics;
pub use model::{CostModel, CostModelConfig, CostTrainingReport, HoldoutEvaluation};
pub use observation::CostObservation;
pub use roi::{CostEstimate, DEFAULT_AGE, RoiPrediction};
pub use schema::{AGE_COLUMN, CONDITION_PREFIX, CostSchema};
