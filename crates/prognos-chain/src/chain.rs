//! Ordered classifier chain with forward probability propagation.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::aggregate::aggregate;
use crate::attribution::top_k_factors;
use crate::config::ChainConfig;
use crate::error::ChainError;
use crate::estimator::{EstimatorError, ForestEstimator, RiskClassifier, RiskExplainer};
use crate::result::{StageResult, StratificationResult};
use crate::schema::{FeatureSchema, FeatureVector};
use crate::target::ConditionTarget;

/// One chain position: a target with its classifier and explainer.
#[derive(Clone)]
pub struct Stage {
    target: ConditionTarget,
    classifier: Arc<dyn RiskClassifier>,
    explainer: Arc<dyn RiskExplainer>,
}

impl Stage {
    /// Bind a target to its classifier and explainer.
    pub fn new(
        target: ConditionTarget,
        classifier: Arc<dyn RiskClassifier>,
        explainer: Arc<dyn RiskExplainer>,
    ) -> Self {
        Self {
            target,
            classifier,
            explainer,
        }
    }

    /// Bind a target to a forest serving as both classifier and explainer.
    #[must_use]
    pub fn from_estimator(target: ConditionTarget, estimator: ForestEstimator) -> Self {
        let estimator = Arc::new(estimator);
        Self::new(target, estimator.clone(), estimator)
    }

    /// Return the stage's target.
    #[must_use]
    pub fn target(&self) -> &ConditionTarget {
        &self.target
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage").field("target", &self.target).finish_non_exhaustive()
    }
}

/// A stage's input vector together with the result it produced.
#[derive(Debug, Clone)]
pub struct StageRun {
    /// Vector the stage was scored on.
    pub input: FeatureVector,
    /// The stage's reported result.
    pub result: StageResult,
}

/// Ordered sequence of dependent binary classifiers.
///
/// Stage *i* scores the schema-aligned vector extended with the
/// probabilities of stages `0..i`, each under its target's
/// [`ConditionTarget::propagated_feature`] name.
#[derive(Debug, Clone)]
pub struct ClassifierChain {
    schema: FeatureSchema,
    stages: Vec<Stage>,
    config: ChainConfig,
}

impl ClassifierChain {
    /// Validate and assemble a chain.
    ///
    /// # Errors
    ///
    /// | Variant                            | When                                            |
    /// |------------------------------------|-------------------------------------------------|
    /// | [`ChainError::EmptyChain`]         | `stages` is empty                               |
    /// | [`ChainError::DuplicateTarget`]    | two stages share a target                       |
    /// | [`ChainError::StageInputMismatch`] | a classifier declares inputs the chain won't feed |
    /// | [`ChainError::InvalidTopK`]        | `config.top_k` is zero                          |
    pub fn new(
        schema: FeatureSchema,
        stages: Vec<Stage>,
        config: ChainConfig,
    ) -> Result<Self, ChainError> {
        config.validate()?;
        if stages.is_empty() {
            return Err(ChainError::EmptyChain);
        }

        let mut seen = HashSet::with_capacity(stages.len());
        let mut inputs = schema.names().to_vec();
        for (position, stage) in stages.iter().enumerate() {
            let label = stage.target.label();
            if !seen.insert(label) {
                return Err(ChainError::DuplicateTarget {
                    label: label.to_string(),
                });
            }
            if let Some(declared) = stage.classifier.expected_features()
                && declared != inputs.as_slice()
            {
                return Err(ChainError::StageInputMismatch {
                    stage: position,
                    target: label.to_string(),
                    expected: inputs,
                    got: declared.to_vec(),
                });
            }
            inputs.push(stage.target.propagated_feature());
        }

        info!(
            n_stages = stages.len(),
            n_features = schema.len(),
            top_k = config.top_k,
            "classifier chain ready"
        );

        Ok(Self {
            schema,
            stages,
            config,
        })
    }

    /// Return the feature schema.
    #[must_use]
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Return the stages in execution order.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Return the reporting policy.
    #[must_use]
    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Iterate over targets in execution order.
    pub fn targets(&self) -> impl Iterator<Item = &ConditionTarget> {
        self.stages.iter().map(Stage::target)
    }

    /// Run every stage on `features`, returning one result per stage.
    ///
    /// The input is aligned to the schema first; aligned input passes through
    /// unchanged.
    ///
    /// # Errors
    ///
    /// | Variant                               | When                                   |
    /// |---------------------------------------|----------------------------------------|
    /// | [`ChainError::NonFiniteFeature`]      | a schema feature is NaN or infinite    |
    /// | [`ChainError::Estimator`]             | a classifier or explainer fails, or an attribution is NaN or infinite |
    /// | [`ChainError::ProbabilityOutOfRange`] | a stage reports a value outside [0, 1] |
    pub fn run(&self, features: &FeatureVector) -> Result<Vec<StageResult>, ChainError> {
        Ok(self
            .run_traced(features)?
            .into_iter()
            .map(|run| run.result)
            .collect())
    }

    /// Like [`ClassifierChain::run`], also returning each stage's input vector.
    ///
    /// # Errors
    ///
    /// See [`ClassifierChain::run`].
    #[instrument(skip_all, fields(n_stages = self.stages.len()))]
    pub fn run_traced(&self, features: &FeatureVector) -> Result<Vec<StageRun>, ChainError> {
        let mut current = self.schema.align_vector(features)?;
        let mut runs = Vec::with_capacity(self.stages.len());
        let last = self.stages.len() - 1;

        for (position, stage) in self.stages.iter().enumerate() {
            let estimator_err = |source| ChainError::Estimator {
                target: stage.target.label().to_string(),
                source,
            };

            let probability = stage
                .classifier
                .predict_probability(&current)
                .map_err(estimator_err)?;
            if !(0.0..=1.0).contains(&probability) {
                return Err(ChainError::ProbabilityOutOfRange {
                    target: stage.target.label().to_string(),
                    probability,
                });
            }

            let attributions = stage.explainer.explain(&current).map_err(estimator_err)?;
            if let Some(bad) = attributions.iter().find(|a| !a.score.is_finite()) {
                return Err(estimator_err(EstimatorError::Failed {
                    reason: format!("non-finite attribution {} for {}", bad.score, bad.feature),
                }));
            }
            let result = StageResult {
                condition: stage.target.display_name(),
                risk_score: probability,
                risk_tier: self.config.thresholds.tier(probability),
                key_risk_factors: top_k_factors(&attributions, self.config.top_k),
            };
            debug!(
                stage = position,
                condition = %stage.target,
                probability,
                tier = %result.risk_tier,
                "stage scored"
            );

            let next = (position < last)
                .then(|| current.with_feature(&stage.target.propagated_feature(), probability));
            runs.push(StageRun {
                input: current,
                result,
            });
            match next {
                Some(next) => current = next,
                None => break,
            }
        }

        Ok(runs)
    }

    /// Align raw patient features, run the chain, and aggregate the result.
    ///
    /// # Errors
    ///
    /// See [`ClassifierChain::run`].
    #[instrument(skip(self, raw), fields(n_raw = raw.len()))]
    pub fn stratify(
        &self,
        patient_id: &str,
        age: Option<f64>,
        raw: &BTreeMap<String, f64>,
    ) -> Result<StratificationResult, ChainError> {
        let aligned = self.schema.align(raw)?;
        let stage_results = self.run(&aligned)?;
        aggregate(patient_id, age, stage_results)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::estimator::Attribution;
    use crate::tier::RiskTier;

    /// Returns a fixed probability and attributes each feature its value.
    struct Fixed {
        probability: f64,
        expected: Option<Vec<String>>,
        seen: Mutex<Vec<FeatureVector>>,
    }

    impl Fixed {
        fn new(probability: f64) -> Arc<Self> {
            Arc::new(Self {
                probability,
                expected: None,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl RiskClassifier for Fixed {
        fn predict_probability(&self, features: &FeatureVector) -> Result<f64, EstimatorError> {
            self.seen.lock().unwrap().push(features.clone());
            Ok(self.probability)
        }

        fn expected_features(&self) -> Option<&[String]> {
            self.expected.as_deref()
        }
    }

    impl RiskExplainer for Fixed {
        fn explain(&self, features: &FeatureVector) -> Result<Vec<Attribution>, EstimatorError> {
            Ok(features
                .iter()
                .map(|(name, value)| Attribution {
                    feature: name.to_string(),
                    score: value,
                })
                .collect())
        }
    }

    fn schema() -> FeatureSchema {
        FeatureSchema::new(vec!["Age".into(), "BMI".into()]).unwrap()
    }

    fn stage(label: &str, est: &Arc<Fixed>) -> Stage {
        Stage::new(ConditionTarget::new(label).unwrap(), est.clone(), est.clone())
    }

    #[test]
    fn empty_chain_rejected() {
        let err = ClassifierChain::new(schema(), vec![], ChainConfig::new()).unwrap_err();
        assert!(matches!(err, ChainError::EmptyChain));
    }

    #[test]
    fn duplicate_target_rejected() {
        let est = Fixed::new(0.1);
        let err = ClassifierChain::new(
            schema(),
            vec![stage("A", &est), stage("A", &est)],
            ChainConfig::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ChainError::DuplicateTarget { .. }));
    }

    #[test]
    fn declared_inputs_checked() {
        let first = Arc::new(Fixed {
            probability: 0.1,
            expected: Some(vec!["Age".into(), "BMI".into()]),
            seen: Mutex::new(Vec::new()),
        });
        let second = Arc::new(Fixed {
            probability: 0.1,
            expected: Some(vec!["Age".into(), "BMI".into()]),
            seen: Mutex::new(Vec::new()),
        });
        let err = ClassifierChain::new(
            schema(),
            vec![stage("A", &first), stage("B", &second)],
            ChainConfig::new(),
        )
        .unwrap_err();
        match err {
            ChainError::StageInputMismatch { stage, expected, .. } => {
                assert_eq!(stage, 1);
                assert_eq!(expected, vec!["Age", "BMI", "A_prob"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_top_k_rejected() {
        let est = Fixed::new(0.1);
        let err = ClassifierChain::new(
            schema(),
            vec![stage("A", &est)],
            ChainConfig::new().with_top_k(0),
        )
        .unwrap_err();
        assert!(matches!(err, ChainError::InvalidTopK { top_k: 0 }));
    }

    #[test]
    fn out_of_range_probability_is_request_error() {
        let est = Fixed::new(1.5);
        let chain = ClassifierChain::new(schema(), vec![stage("A", &est)], ChainConfig::new()).unwrap();
        let input = schema().align(&BTreeMap::new()).unwrap();
        let err = chain.run(&input).unwrap_err();
        assert!(matches!(err, ChainError::ProbabilityOutOfRange { .. }));
    }

    /// Attributes NaN to every feature.
    struct Unexplainable;

    impl RiskExplainer for Unexplainable {
        fn explain(&self, features: &FeatureVector) -> Result<Vec<Attribution>, EstimatorError> {
            Ok(features
                .iter()
                .map(|(name, _)| Attribution {
                    feature: name.to_string(),
                    score: f64::NAN,
                })
                .collect())
        }
    }

    #[test]
    fn non_finite_attribution_is_request_error() {
        let est = Fixed::new(0.4);
        let stage = Stage::new(
            ConditionTarget::new("A").unwrap(),
            est,
            Arc::new(Unexplainable),
        );
        let chain = ClassifierChain::new(schema(), vec![stage], ChainConfig::new()).unwrap();
        let err = chain.run(&schema().align(&BTreeMap::new()).unwrap()).unwrap_err();
        match err {
            ChainError::Estimator {
                target,
                source: EstimatorError::Failed { reason },
            } => {
                assert_eq!(target, "A");
                assert!(reason.contains("Age"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn last_stage_output_not_propagated() {
        let a = Fixed::new(0.3);
        let b = Fixed::new(0.6);
        let chain = ClassifierChain::new(
            schema(),
            vec![stage("A", &a), stage("B", &b)],
            ChainConfig::new(),
        )
        .unwrap();
        let runs = chain.run_traced(&schema().align(&BTreeMap::new()).unwrap()).unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[1].input.get("A_prob"), Some(0.3));
        assert_eq!(runs[1].input.get("B_prob"), None);
        assert_eq!(runs[1].result.risk_tier, RiskTier::Moderate);
    }

    #[test]
    fn input_is_realigned_before_scoring() {
        let a = Fixed::new(0.3);
        let chain = ClassifierChain::new(schema(), vec![stage("A", &a)], ChainConfig::new()).unwrap();
        let stray = schema().align(&BTreeMap::new()).unwrap().with_feature("A_prob", 0.99);
        chain.run(&stray).unwrap();
        let seen = a.seen.lock().unwrap();
        assert_eq!(seen[0].names(), schema().names());
    }
}
