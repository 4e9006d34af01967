use crate::core::features::{FeatureSchema, FeatureVector};
use crate::core::model::{ModelArtifact, ModelError, ModelSpec, Tree};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("feature vector has {actual} values, model expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Model-specific decomposition of a prediction, consumed by the explainer
#[derive(Debug, Clone, PartialEq)]
pub enum Breakdown {
    /// Per-feature decision-path deltas summed over all trees
    AdditiveTree { contributions: Vec<f64> },
    /// Coefficients and the neutral input the baseline was computed from
    LinearWeights { weights: Vec<f64>, reference: Vec<f64> },
}

impl Breakdown {
    pub fn method(&self) -> &'static str {
        match self {
            Breakdown::AdditiveTree { .. } => "additive_tree",
            Breakdown::LinearWeights { .. } => "linear_weights",
        }
    }
}

/// Output of a single scoring call
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub score: f64,
    pub baseline: f64,
    pub breakdown: Breakdown,
}

#[derive(Debug)]
enum Model {
    Trees { base_score: f64, trees: Vec<Tree> },
    Linear { intercept: f64, weights: Vec<f64>, reference: Vec<f64> },
}

/// Trained supplier-match model, read-only after load
///
/// Cloning shares the underlying model.
#[derive(Debug, Clone)]
pub struct MatchScorer {
    inner: Arc<ScorerInner>,
}

#[derive(Debug)]
struct ScorerInner {
    model_identifier: String,
    schema: Arc<FeatureSchema>,
    model: Model,
    baseline: f64,
}

impl MatchScorer {
    /// Load the artifact at `path`; any failure is fatal for the process
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let artifact = ModelArtifact::load(path)?;
        let scorer = Self::from_artifact(artifact).map_err(|reason| ModelError::Unavailable {
            path: path.to_path_buf(),
            reason,
        })?;

        tracing::info!(
            model = %scorer.model_identifier(),
            features = scorer.schema().len(),
            path = %path.display(),
            "Loaded match model"
        );
        Ok(scorer)
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, String> {
        artifact.validate()?;
        let schema = artifact.schema().map_err(|e| e.to_string())?;

        let (model, baseline) = match artifact.model {
            ModelSpec::AdditiveTrees { base_score, trees } => {
                let baseline = base_score + trees.iter().map(Tree::root_value).sum::<f64>();
                (Model::Trees { base_score, trees }, baseline)
            }
            ModelSpec::Linear {
                intercept,
                weights,
                reference,
            } => {
                let baseline = intercept
                    + weights
                        .iter()
                        .zip(reference.iter())
                        .map(|(w, r)| w * r)
                        .sum::<f64>();
                (
                    Model::Linear {
                        intercept,
                        weights,
                        reference,
                    },
                    baseline,
                )
            }
        };

        Ok(Self {
            inner: Arc::new(ScorerInner {
                model_identifier: artifact.model_identifier,
                schema: Arc::new(schema),
                model,
                baseline,
            }),
        })
    }

    pub fn model_identifier(&self) -> &str {
        &self.inner.model_identifier
    }

    pub fn schema(&self) -> &Arc<FeatureSchema> {
        &self.inner.schema
    }

    /// Score model output for a neutral input
    pub fn baseline(&self) -> f64 {
        self.inner.baseline
    }

    /// Check the loaded schema against an expected, ordered name list
    pub fn ensure_features(&self, expected: &[String]) -> Result<(), String> {
        let actual: Vec<&str> = self.inner.schema.names().collect();
        if actual.iter().copied().eq(expected.iter().map(String::as_str)) {
            Ok(())
        } else {
            Err(format!(
                "model features [{}] do not match expected [{}]",
                actual.join(", "),
                expected.join(", ")
            ))
        }
    }

    /// Score a feature vector
    ///
    /// Pure: identical vectors give bit-identical results.
    pub fn score(&self, vector: &FeatureVector) -> Result<Prediction, ScoringError> {
        let x = vector.values();
        let expected = self.inner.schema.len();
        if x.len() != expected {
            return Err(ScoringError::DimensionMismatch {
                expected,
                actual: x.len(),
            });
        }

        let (score, breakdown) = match &self.inner.model {
            Model::Trees { base_score, trees } => {
                let mut contributions = vec![0.0; expected];
                let mut score = *base_score;
                for tree in trees {
                    score += tree.predict_into(x, &mut contributions);
                }
                (score, Breakdown::AdditiveTree { contributions })
            }
            Model::Linear {
                intercept,
                weights,
                reference,
            } => {
                let score = intercept + weights.iter().zip(x).map(|(w, v)| w * v).sum::<f64>();
                (
                    score,
                    Breakdown::LinearWeights {
                        weights: weights.clone(),
                        reference: reference.clone(),
                    },
                )
            }
        };

        Ok(Prediction {
            score,
            baseline: self.inner.baseline,
            breakdown,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::features::{FeatureDescriptor, FeatureVectorBuilder};
    use crate::core::model::{Split, TreeNode};
    use serde_json::json;
    use std::collections::HashMap;

    fn tree_artifact() -> ModelArtifact {
        ModelArtifact {
            model_identifier: "trees-test".to_string(),
            features: vec![
                FeatureDescriptor::continuous("price"),
                FeatureDescriptor::continuous("supplier_rating"),
            ],
            model: ModelSpec::AdditiveTrees {
                base_score: 0.5,
                trees: vec![
                    Tree {
                        nodes: vec![
                            TreeNode {
                                value: 0.0,
                                split: Some(Split { feature: 0, threshold: 100.0, left: 1, right: 2 }),
                            },
                            TreeNode { value: 0.1, split: None },
                            TreeNode { value: -0.1, split: None },
                        ],
                    },
                    Tree {
                        nodes: vec![
                            TreeNode {
                                value: 0.02,
                                split: Some(Split { feature: 1, threshold: 4.0, left: 1, right: 2 }),
                            },
                            TreeNode { value: -0.05, split: None },
                            TreeNode { value: 0.09, split: None },
                        ],
                    },
                ],
            },
        }
    }

    fn vector(scorer: &MatchScorer, price: f64, rating: f64) -> FeatureVector {
        let raw: HashMap<String, serde_json::Value> =
            serde_json::from_value(json!({ "price": price, "supplier_rating": rating })).unwrap();
        FeatureVectorBuilder::new(Arc::clone(scorer.schema()))
            .build(&raw)
            .unwrap()
    }

    #[test]
    fn test_tree_score_and_baseline() {
        let scorer = MatchScorer::from_artifact(tree_artifact()).unwrap();
        assert!((scorer.baseline() - 0.52).abs() < 1e-12);

        let prediction = scorer.score(&vector(&scorer, 50.0, 4.5)).unwrap();
        assert!((prediction.score - 0.69).abs() < 1e-12);

        match prediction.breakdown {
            Breakdown::AdditiveTree { contributions } => {
                let total: f64 = contributions.iter().sum();
                assert!((total - (prediction.score - prediction.baseline)).abs() < 1e-12);
            }
            other => panic!("unexpected breakdown {:?}", other),
        }
    }

    #[test]
    fn test_score_is_deterministic() {
        let scorer = MatchScorer::from_artifact(tree_artifact()).unwrap();
        let v = vector(&scorer, 150.0, 3.0);
        let a = scorer.score(&v).unwrap();
        let b = scorer.score(&v).unwrap();
        assert_eq!(a.score.to_bits(), b.score.to_bits());
        assert_eq!(a.baseline.to_bits(), b.baseline.to_bits());
    }

    #[test]
    fn test_linear_score() {
        let artifact = ModelArtifact {
            model_identifier: "linear-test".to_string(),
            features: vec![
                FeatureDescriptor::continuous("price"),
                FeatureDescriptor::continuous("supplier_rating"),
            ],
            model: ModelSpec::Linear {
                intercept: 0.2,
                weights: vec![-0.001, 0.1],
                reference: vec![100.0, 3.0],
            },
        };
        let scorer = MatchScorer::from_artifact(artifact).unwrap();
        assert!((scorer.baseline() - 0.4).abs() < 1e-12);

        let prediction = scorer.score(&vector(&scorer, 50.0, 4.0)).unwrap();
        assert!((prediction.score - 0.55).abs() < 1e-12);
        assert_eq!(prediction.breakdown.method(), "linear_weights");
    }

    #[test]
    fn test_dimension_mismatch() {
        let scorer = MatchScorer::from_artifact(tree_artifact()).unwrap();
        let other = FeatureVectorBuilder::new(Arc::new(FeatureSchema::reference()));
        let mut raw = HashMap::new();
        for name in FeatureSchema::reference().names() {
            raw.insert(name.to_string(), json!(1));
        }
        let v = other.build(&raw).unwrap();
        assert!(matches!(
            scorer.score(&v),
            Err(ScoringError::DimensionMismatch { expected: 2, actual: 15 })
        ));
    }

    #[test]
    fn test_ensure_features() {
        let scorer = MatchScorer::from_artifact(tree_artifact()).unwrap();
        assert!(scorer
            .ensure_features(&["price".to_string(), "supplier_rating".to_string()])
            .is_ok());
        assert!(scorer.ensure_features(&["price".to_string()]).is_err());
    }
}
