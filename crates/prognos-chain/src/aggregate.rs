use tracing::debug;

use crate::error::ChainError;
use crate::result::{StageResult, StratificationResult};

/// Combine stage results into a patient-level result.
///
/// The overall score is the highest stage probability; on ties the earliest
/// stage in chain order supplies the primary condition.
///
/// # Errors
///
/// Returns [`ChainError::EmptyChain`] when `stage_results` is empty.
pub fn aggregate(
    patient_id: impl Into<String>,
    age: Option<f64>,
    stage_results: Vec<StageResult>,
) -> Result<StratificationResult, ChainError> {
    let mut stages = stage_results.iter();
    let Some(mut best) = stages.next() else {
        return Err(ChainError::EmptyChain);
    };
    for stage in stages {
        if stage.risk_score > best.risk_score {
            best = stage;
        }
    }

    let overall_risk_score = best.risk_score;
    let present_risk_condition = best.condition.clone();
    debug!(overall_risk_score, condition = %present_risk_condition, "aggregated stage results");

    Ok(StratificationResult {
        patient_id: patient_id.into(),
        age,
        overall_risk_score,
        present_risk_condition,
        predicted_outcomes: stage_results,
    })
}
