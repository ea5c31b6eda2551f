//! Proactive and reactive cost regressors over `(age, condition)`.

use std::path::Path;

use prognos_chain::StratificationResult;
use prognos_forest::{
    ForestError, ForestTask, RandomForest, RandomForestConfig, read_artifact, write_artifact,
};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, instrument, warn};

use crate::error::CostError;
use crate::metrics::RegressionMetrics;
use crate::observation::CostObservation;
use crate::roi::{CostEstimate, DEFAULT_AGE, RoiPrediction};
use crate::schema::CostSchema;

/// Artifact kind tag for a stored cost model.
const COST_KIND: &str = "cost-model";

/// Training options for [`CostModel::train`].
///
/// # Defaults
///
/// | Parameter          | Default     |
/// |--------------------|-------------|
/// | `holdout_fraction` | `Some(0.2)` |
/// | `seed`             | 42          |
#[derive(Debug, Clone)]
pub struct CostModelConfig {
    forest: RandomForestConfig,
    holdout_fraction: Option<f64>,
    seed: u64,
}

impl CostModelConfig {
    /// Train both regressors with `forest`.
    #[must_use]
    pub fn new(forest: RandomForestConfig) -> Self {
        Self {
            forest,
            holdout_fraction: Some(0.2),
            seed: 42,
        }
    }

    /// Set the share of rows held out for evaluation; `None` skips evaluation.
    #[must_use]
    pub fn with_holdout_fraction(mut self, holdout_fraction: Option<f64>) -> Self {
        self.holdout_fraction = holdout_fraction;
        self
    }

    /// Set the seed used to shuffle rows before the holdout split.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Holdout scores of both regressors.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct HoldoutEvaluation {
    /// Rows held out.
    pub n_test: usize,
    /// Proactive regressor scores.
    pub proactive: RegressionMetrics,
    /// Reactive regressor scores.
    pub reactive: RegressionMetrics,
}

/// Summary of a cost model training run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CostTrainingReport {
    /// Observations used for the final fit.
    pub n_observations: usize,
    /// Feature columns of both regressors.
    pub columns: Vec<String>,
    /// Holdout scores, when evaluation ran.
    pub holdout: Option<HoldoutEvaluation>,
}

/// Two regression forests pricing preventive and emergency care.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CostModel {
    schema: CostSchema,
    proactive: RandomForest,
    reactive: RandomForest,
}

impl CostModel {
    /// Fit both regressors on `observations`.
    ///
    /// With a holdout fraction, rows are shuffled, the regressors are first
    /// fitted on the remainder and scored on the held-out share, then refitted
    /// on every row.
    ///
    /// # Errors
    ///
    /// | Variant                                | When                                     |
    /// |----------------------------------------|------------------------------------------|
    /// | [`CostError::EmptyObservations`]       | `observations` is empty                  |
    /// | [`CostError::EmptyCondition`]          | a condition is blank                     |
    /// | [`CostError::NonFiniteObservation`]    | an age or cost is NaN or infinite        |
    /// | [`CostError::InvalidHoldoutFraction`]  | the fraction is outside (0.0, 0.5]       |
    /// | [`CostError::Training`]                | a forest fails to fit                    |
    #[instrument(skip_all, fields(n_observations = observations.len()))]
    pub fn train(
        observations: &[CostObservation],
        config: &CostModelConfig,
    ) -> Result<(Self, CostTrainingReport), CostError> {
        validate_observations(observations)?;
        let schema = CostSchema::from_observations(observations);

        let holdout = match config.holdout_fraction {
            Some(_) if observations.len() < 2 => {
                warn!("too few observations to hold any out, skipping evaluation");
                None
            }
            Some(fraction) => Some(evaluate_holdout(observations, &schema, config, fraction)?),
            None => None,
        };

        let model = Self::fit(observations, schema, &config.forest)?;
        let report = CostTrainingReport {
            n_observations: observations.len(),
            columns: model.schema.columns(),
            holdout,
        };
        info!(
            n_conditions = model.schema.conditions().len(),
            "cost model trained"
        );
        Ok((model, report))
    }

    fn fit(
        observations: &[CostObservation],
        schema: CostSchema,
        forest: &RandomForestConfig,
    ) -> Result<Self, CostError> {
        let columns = schema.columns();
        let rows: Vec<Vec<f64>> = observations
            .iter()
            .map(|o| schema.encode(o.age, &o.condition))
            .collect();
        let proactive_costs: Vec<f64> = observations.iter().map(|o| o.proactive_cost).collect();
        let reactive_costs: Vec<f64> = observations.iter().map(|o| o.reactive_cost).collect();

        let proactive = forest
            .fit_regressor(&rows, &proactive_costs, &columns)
            .map_err(|source| CostError::Training {
                regime: "proactive",
                source,
            })?
            .into_forest();
        let reactive = forest
            .fit_regressor(&rows, &reactive_costs, &columns)
            .map_err(|source| CostError::Training {
                regime: "reactive",
                source,
            })?
            .into_forest();

        Ok(Self {
            schema,
            proactive,
            reactive,
        })
    }

    /// Return the encoding schema.
    #[must_use]
    pub fn schema(&self) -> &CostSchema {
        &self.schema
    }

    /// Price one condition at `age`. Unknown conditions get the baseline
    /// prediction for that age.
    ///
    /// # Errors
    ///
    /// Returns [`CostError::Prediction`] when a regressor rejects the input.
    pub fn predict(&self, age: f64, condition: &str) -> Result<CostEstimate, CostError> {
        if !self.schema.knows(condition) {
            warn!(condition, "condition unseen in cost training, using baseline");
        }
        let encoded = self.schema.encode(age, condition);
        let prediction_err = |source| CostError::Prediction {
            condition: condition.to_string(),
            source,
        };
        let proactive = self.proactive.predict_value(&encoded).map_err(prediction_err)?;
        let reactive = self.reactive.predict_value(&encoded).map_err(prediction_err)?;
        Ok(CostEstimate {
            condition: condition.to_string(),
            predicted_proactive_cost: proactive,
            predicted_reactive_cost: reactive,
            potential_savings: reactive - proactive,
        })
    }

    /// Price every distinct condition of a stratification result, primary
    /// condition first. A missing age is taken as 65.
    ///
    /// # Errors
    ///
    /// Returns [`CostError::Prediction`] when a regressor rejects the input.
    #[instrument(skip_all, fields(patient_id = %result.patient_id))]
    pub fn estimate(&self, result: &StratificationResult) -> Result<RoiPrediction, CostError> {
        let age = result.age.unwrap_or(DEFAULT_AGE);
        let predicted_costs = result
            .condition_names()
            .into_iter()
            .map(|condition| self.predict(age, condition))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(n_conditions = predicted_costs.len(), age, "costs estimated");
        Ok(RoiPrediction {
            patient_id: result.patient_id.clone(),
            age_used_for_prediction: age,
            predicted_costs,
        })
    }

    /// Save the model to a versioned binary file.
    ///
    /// # Errors
    ///
    /// Returns [`CostError::Artifact`] when encoding or writing fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CostError> {
        write_artifact(path.as_ref(), COST_KIND, self)?;
        Ok(())
    }

    /// Load a model from a versioned binary file.
    ///
    /// # Errors
    ///
    /// | Variant                      | When                                                   |
    /// |------------------------------|--------------------------------------------------------|
    /// | [`CostError::Artifact`]      | the file is missing, corrupt, or of another version/kind |
    /// | [`CostError::InvalidModel`]  | a regressor is malformed, a classifier, or mis-sized   |
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CostError> {
        let model: Self = read_artifact(path.as_ref(), COST_KIND)?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<(), CostError> {
        let width = self.schema.columns().len();
        for (regime, forest) in [("proactive", &self.proactive), ("reactive", &self.reactive)] {
            let invalid = |source| CostError::InvalidModel { regime, source };
            forest.validate().map_err(invalid)?;
            if forest.task() != ForestTask::Regressor {
                return Err(invalid(ForestError::WrongTask {
                    expected: "regressor",
                    actual: "classifier",
                }));
            }
            if forest.n_features() != width {
                return Err(invalid(ForestError::MalformedModel {
                    reason: format!(
                        "{} features, cost schema has {width} columns",
                        forest.n_features()
                    ),
                }));
            }
        }
        Ok(())
    }
}

fn validate_observations(observations: &[CostObservation]) -> Result<(), CostError> {
    if observations.is_empty() {
        return Err(CostError::EmptyObservations);
    }
    for (index, o) in observations.iter().enumerate() {
        if o.condition.trim().is_empty() {
            return Err(CostError::EmptyCondition { index });
        }
        for (field, value) in [
            ("age", o.age),
            ("proactive_cost", o.proactive_cost),
            ("reactive_cost", o.reactive_cost),
        ] {
            if !value.is_finite() {
                return Err(CostError::NonFiniteObservation { index, field });
            }
        }
    }
    Ok(())
}

fn evaluate_holdout(
    observations: &[CostObservation],
    schema: &CostSchema,
    config: &CostModelConfig,
    fraction: f64,
) -> Result<HoldoutEvaluation, CostError> {
    if !(fraction > 0.0 && fraction <= 0.5) {
        return Err(CostError::InvalidHoldoutFraction { fraction });
    }
    let mut order: Vec<usize> = (0..observations.len()).collect();
    order.shuffle(&mut ChaCha8Rng::seed_from_u64(config.seed));

    let n_test = ((observations.len() as f64) * fraction).ceil() as usize;
    let (test_idx, train_idx) = order.split_at(n_test.min(observations.len() - 1));
    let train: Vec<CostObservation> = train_idx.iter().map(|&i| observations[i].clone()).collect();
    let model = CostModel::fit(&train, schema.clone(), &config.forest)?;

    let mut predicted = (Vec::new(), Vec::new());
    let mut actual = (Vec::new(), Vec::new());
    for &i in test_idx {
        let o = &observations[i];
        let estimate = model.predict(o.age, &o.condition)?;
        predicted.0.push(estimate.predicted_proactive_cost);
        predicted.1.push(estimate.predicted_reactive_cost);
        actual.0.push(o.proactive_cost);
        actual.1.push(o.reactive_cost);
    }

    let evaluation = HoldoutEvaluation {
        n_test: test_idx.len(),
        proactive: RegressionMetrics::compute(&actual.0, &predicted.0),
        reactive: RegressionMetrics::compute(&actual.1, &predicted.1),
    };
    info!(
        n_test = evaluation.n_test,
        proactive_mae = evaluation.proactive.mae,
        proactive_r2 = evaluation.proactive.r2,
        reactive_mae = evaluation.reactive.mae,
        reactive_r2 = evaluation.reactive.r2,
        "cost model holdout evaluation"
    );
    Ok(evaluation)
}
