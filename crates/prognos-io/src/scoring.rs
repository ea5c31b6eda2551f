//! Per-patient scoring with failures kept at the patient boundary.

use prognos_chain::{ChainError, ModelBundle, StratificationResult};
use prognos_cost::{CostError, CostModel, RoiPrediction};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::error::IoError;
use crate::patient::{PatientEncoding, encode_patient};

/// Why one patient could not be scored.
#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    /// The raw record could not be turned into features.
    #[error("invalid patient record")]
    Encoding(#[source] IoError),

    /// The classifier chain rejected the patient.
    #[error("risk stratification failed")]
    Stratification(#[source] ChainError),

    /// The cost model rejected the stratification result.
    #[error("cost estimation failed")]
    Cost(#[source] CostError),
}

/// Result for one patient: the combined payload, or the reason it failed.
///
/// Serializes untagged, so a scored patient reads
/// `{"risk_stratification_result", "roi_prediction_result"}` and a failed one
/// `{"patientId", "error"}`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PatientOutcome {
    /// Scored patient.
    Scored {
        /// Chain output.
        risk_stratification_result: StratificationResult,
        /// Cost estimate, when a cost model was supplied.
        #[serde(skip_serializing_if = "Option::is_none")]
        roi_prediction_result: Option<RoiPrediction>,
    },
    /// Patient that failed anywhere between encoding and costing.
    Failed {
        /// Identifier from the raw record, or the encoding's default.
        #[serde(rename = "patientId")]
        patient_id: String,
        /// Error message with its causes, outermost first.
        error: String,
    },
}

impl PatientOutcome {
    /// `true` for [`PatientOutcome::Failed`].
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, PatientOutcome::Failed { .. })
    }

    /// Total potential savings of a scored patient with a cost estimate.
    #[must_use]
    pub fn potential_savings(&self) -> Option<f64> {
        match self {
            PatientOutcome::Scored {
                roi_prediction_result: Some(roi),
                ..
            } => Some(roi.total_potential_savings()),
            _ => None,
        }
    }
}

/// Encode, stratify, and optionally cost one raw patient record.
///
/// Never fails: any error becomes [`PatientOutcome::Failed`] carrying the
/// patient's id and the error chain.
pub fn score_patient(
    raw: &Value,
    encoding: &PatientEncoding,
    bundle: &ModelBundle,
    cost_model: Option<&CostModel>,
) -> PatientOutcome {
    match try_score(raw, encoding, bundle, cost_model) {
        Ok((risk_stratification_result, roi_prediction_result)) => PatientOutcome::Scored {
            risk_stratification_result,
            roi_prediction_result,
        },
        Err(e) => {
            let patient_id = encoding.patient_id(raw);
            let error = error_chain(&e);
            warn!(patient_id = %patient_id, error = %error, "patient failed");
            PatientOutcome::Failed { patient_id, error }
        }
    }
}

/// Score every record in parallel, keeping input order.
#[instrument(skip_all, fields(n_records = records.len()))]
pub fn score_patients(
    records: &[Value],
    encoding: &PatientEncoding,
    bundle: &ModelBundle,
    cost_model: Option<&CostModel>,
) -> Vec<PatientOutcome> {
    let outcomes: Vec<PatientOutcome> = records
        .par_iter()
        .map(|raw| score_patient(raw, encoding, bundle, cost_model))
        .collect();
    debug!(
        n_failed = outcomes.iter().filter(|o| o.is_failed()).count(),
        "batch scored"
    );
    outcomes
}

fn try_score(
    raw: &Value,
    encoding: &PatientEncoding,
    bundle: &ModelBundle,
    cost_model: Option<&CostModel>,
) -> Result<(StratificationResult, Option<RoiPrediction>), PatientError> {
    let patient = encode_patient(raw, encoding).map_err(PatientError::Encoding)?;
    let stratification = bundle
        .stratify(&patient.id, patient.age, &patient.features)
        .map_err(PatientError::Stratification)?;
    let roi = cost_model
        .map(|model| model.estimate(&stratification))
        .transpose()
        .map_err(PatientError::Cost)?;
    Ok((stratification, roi))
}

/// `outer: cause: root cause`.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
