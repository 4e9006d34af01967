use crate::core::features::FeatureVector;
use crate::core::scorer::{Breakdown, Prediction};
use serde::Serialize;
use thiserror::Error;

/// Relative tolerance for `Σ attributions ≈ score − baseline`
pub const SUM_TOLERANCE: f64 = 1e-3;

const ABSOLUTE_FLOOR: f64 = 1e-9;

#[derive(Debug, Error)]
pub enum ExplainError {
    #[error("explanation failed: {reason}")]
    Failed { reason: String },
}

impl ExplainError {
    fn failed(reason: impl Into<String>) -> Self {
        ExplainError::Failed {
            reason: reason.into(),
        }
    }
}

/// Signed contribution of one feature
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureAttribution {
    pub name: String,
    pub value: f64,
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchExplanation {
    pub score: f64,
    pub baseline: f64,
    pub attributions: Vec<FeatureAttribution>,
    pub model_identifier: String,
}

impl MatchExplanation {
    pub fn attribution_total(&self) -> f64 {
        self.attributions.iter().map(|a| a.value).sum()
    }
}

/// Magnitude bucket used in rationale sentences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strength {
    Strong,
    Moderate,
    Weak,
}

impl Strength {
    fn as_str(self) -> &'static str {
        match self {
            Strength::Strong => "strong",
            Strength::Moderate => "moderate",
            Strength::Weak => "weak",
        }
    }
}

/// Turns a scorer breakdown into ordered per-feature attributions
#[derive(Debug, Clone, Copy)]
pub struct Explainer {
    strong_cutoff: f64,
    moderate_cutoff: f64,
}

impl Default for Explainer {
    fn default() -> Self {
        Self {
            strong_cutoff: 0.3,
            moderate_cutoff: 0.1,
        }
    }
}

impl Explainer {
    /// Cutoffs are fractions of the total movement `|score − baseline|`
    pub fn new(strong_cutoff: f64, moderate_cutoff: f64) -> Self {
        Self {
            strong_cutoff,
            moderate_cutoff,
        }
    }

    pub fn explain(
        &self,
        prediction: &Prediction,
        vector: &FeatureVector,
        model_identifier: &str,
    ) -> Result<MatchExplanation, ExplainError> {
        let values = self.attribute(&prediction.breakdown, vector)?;

        if !prediction.score.is_finite() || !prediction.baseline.is_finite() {
            return Err(ExplainError::failed("score or baseline is not finite"));
        }
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(ExplainError::failed(format!(
                "attribution for '{}' is not finite",
                vector.schema().descriptors()[i].name
            )));
        }

        let delta = prediction.score - prediction.baseline;
        let total: f64 = values.iter().sum();
        let allowed = (SUM_TOLERANCE * delta.abs()).max(ABSOLUTE_FLOOR);
        if (total - delta).abs() > allowed {
            return Err(ExplainError::failed(format!(
                "attributions sum to {} but score - baseline is {}",
                total, delta
            )));
        }

        let scale = if delta.abs() > ABSOLUTE_FLOOR {
            delta.abs()
        } else {
            values.iter().map(|v| v.abs()).sum()
        };

        let mut attributions: Vec<FeatureAttribution> = vector
            .iter()
            .zip(values)
            .map(|((name, raw), value)| FeatureAttribution {
                name: name.to_string(),
                value,
                rationale: self.rationale(name, raw, value, scale),
            })
            .collect();

        // Stable sort keeps schema order among equal magnitudes
        attributions.sort_by(|a, b| b.value.abs().total_cmp(&a.value.abs()));

        Ok(MatchExplanation {
            score: prediction.score,
            baseline: prediction.baseline,
            attributions,
            model_identifier: model_identifier.to_string(),
        })
    }

    fn attribute(&self, breakdown: &Breakdown, vector: &FeatureVector) -> Result<Vec<f64>, ExplainError> {
        let n = vector.len();
        match breakdown {
            Breakdown::AdditiveTree { contributions } => {
                if contributions.len() != n {
                    return Err(ExplainError::failed(format!(
                        "tree breakdown has {} contributions for {} features",
                        contributions.len(),
                        n
                    )));
                }
                Ok(contributions.clone())
            }
            Breakdown::LinearWeights { weights, reference } => {
                if weights.len() != n || reference.len() != n {
                    return Err(ExplainError::failed(format!(
                        "linear breakdown has {} weights and {} reference values for {} features",
                        weights.len(),
                        reference.len(),
                        n
                    )));
                }
                Ok(vector
                    .values()
                    .iter()
                    .zip(weights.iter().zip(reference.iter()))
                    .map(|(x, (w, r))| w * (x - r))
                    .collect())
            }
        }
    }

    fn strength(&self, value: f64, scale: f64) -> Strength {
        if scale <= 0.0 {
            return Strength::Weak;
        }
        let share = value.abs() / scale;
        if share >= self.strong_cutoff {
            Strength::Strong
        } else if share >= self.moderate_cutoff {
            Strength::Moderate
        } else {
            Strength::Weak
        }
    }

    fn rationale(&self, name: &str, raw: f64, value: f64, scale: f64) -> String {
        if value == 0.0 {
            return format!("{} = {} does not change the match score", name, raw);
        }
        let direction = if value > 0.0 { "increases" } else { "decreases" };
        format!(
            "{} = {} {} the match score ({} effect, {:+.4})",
            name,
            raw,
            direction,
            self.strength(value, scale).as_str(),
            value
        )
    }
}
