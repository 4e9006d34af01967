use crate::core::{
    explainer::{ExplainError, Explainer, MatchExplanation},
    features::{FeatureError, FeatureVectorBuilder},
    scorer::{MatchScorer, ScoringError},
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Failures of a single explain-match request
#[derive(Debug, Error)]
pub enum MatchError {
    #[error(transparent)]
    Features(#[from] FeatureError),

    #[error(transparent)]
    Scoring(#[from] ScoringError),

    #[error(transparent)]
    Explain(#[from] ExplainError),
}

/// Main scoring orchestrator
///
/// # Pipeline Stages
/// 1. Feature vector validation and ordering
/// 2. Model scoring
/// 3. Attribution and rationale generation
#[derive(Debug, Clone)]
pub struct Matcher {
    builder: FeatureVectorBuilder,
    scorer: MatchScorer,
    explainer: Explainer,
    default_sample: Arc<HashMap<String, Value>>,
}

impl Matcher {
    /// `builder` may carry configured defaults, but must describe the same
    /// features as the scorer's schema
    pub fn new(
        builder: FeatureVectorBuilder,
        scorer: MatchScorer,
        explainer: Explainer,
        default_sample: HashMap<String, Value>,
    ) -> Self {
        Self {
            builder,
            scorer,
            explainer,
            default_sample: Arc::new(default_sample),
        }
    }

    /// Matcher using the scorer's own schema and default cutoffs
    pub fn with_scorer(scorer: MatchScorer, default_sample: HashMap<String, Value>) -> Self {
        let builder = FeatureVectorBuilder::new(Arc::clone(scorer.schema()));
        Self::new(builder, scorer, Explainer::default(), default_sample)
    }

    pub fn scorer(&self) -> &MatchScorer {
        &self.scorer
    }

    pub fn default_sample(&self) -> &HashMap<String, Value> {
        &self.default_sample
    }

    /// Merge request overrides on top of the configured default sample
    pub fn resolve_features(&self, overrides: Option<&HashMap<String, Value>>) -> HashMap<String, Value> {
        let mut raw = (*self.default_sample).clone();
        if let Some(overrides) = overrides {
            raw.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        raw
    }

    /// Build, score and explain a raw feature mapping
    pub fn explain_match(&self, raw: &HashMap<String, Value>) -> Result<MatchExplanation, MatchError> {
        let vector = self.builder.build(raw)?;
        let prediction = self.scorer.score(&vector)?;

        tracing::debug!(
            model = %self.scorer.model_identifier(),
            method = prediction.breakdown.method(),
            score = prediction.score,
            baseline = prediction.baseline,
            "Scored feature vector"
        );

        let explanation = self
            .explainer
            .explain(&prediction, &vector, self.scorer.model_identifier())?;
        Ok(explanation)
    }
}
