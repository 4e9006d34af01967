use crate::core::features::{FeatureDescriptor, FeatureError, FeatureSchema};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Startup failure: the process must not begin serving
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model unavailable at {path}: {reason}")]
    Unavailable { path: PathBuf, reason: String },
}

impl ModelError {
    fn at(path: &Path, reason: impl Into<String>) -> Self {
        ModelError::Unavailable {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// On-disk trained model: identifier, feature-schema descriptor and body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub model_identifier: String,
    pub features: Vec<FeatureDescriptor>,
    pub model: ModelSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelSpec {
    /// Gradient-boosted regression trees; output is the raw additive margin
    AdditiveTrees { base_score: f64, trees: Vec<Tree> },
    /// `intercept + Σ wᵢxᵢ`; `reference` is the neutral input used as baseline
    Linear {
        intercept: f64,
        weights: Vec<f64>,
        reference: Vec<f64>,
    },
}

/// A regression tree stored as a flat node array rooted at index 0
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

/// `value` is the node's expected output (the leaf output for leaves)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split: Option<Split>,
}

/// `x < threshold` goes left, everything else right
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Split {
    pub feature: usize,
    pub threshold: f64,
    pub left: usize,
    pub right: usize,
}

impl Tree {
    pub fn root_value(&self) -> f64 {
        self.nodes[0].value
    }

    /// Walk the decision path for `x`, crediting each value change to the split feature
    ///
    /// Returns the leaf value. `contributions` accumulates per-feature deltas,
    /// which sum to `leaf - root` for this tree.
    pub fn predict_into(&self, x: &[f64], contributions: &mut [f64]) -> f64 {
        let mut index = 0;
        loop {
            let node = &self.nodes[index];
            let Some(split) = node.split else {
                return node.value;
            };
            let next = if x[split.feature] < split.threshold {
                split.left
            } else {
                split.right
            };
            contributions[split.feature] += self.nodes[next].value - node.value;
            index = next;
        }
    }

    fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if !node.value.is_finite() {
                return Err(format!("node {} has a non-finite value", i));
            }
            if let Some(split) = node.split {
                if split.feature >= n_features {
                    return Err(format!(
                        "node {} splits on feature {} but the schema has {}",
                        i, split.feature, n_features
                    ));
                }
                if !split.threshold.is_finite() {
                    return Err(format!("node {} has a non-finite threshold", i));
                }
                // Children must point forward, which also rules out cycles
                for child in [split.left, split.right] {
                    if child <= i || child >= self.nodes.len() {
                        return Err(format!("node {} has invalid child index {}", i, child));
                    }
                }
            }
        }
        Ok(())
    }
}

impl ModelArtifact {
    /// Read and validate an artifact from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| ModelError::at(path, e.to_string()))?;
        let artifact: ModelArtifact = serde_json::from_slice(&bytes)
            .map_err(|e| ModelError::at(path, format!("malformed artifact: {}", e)))?;
        artifact
            .validate()
            .map_err(|reason| ModelError::at(path, reason))?;
        Ok(artifact)
    }

    /// Build the feature schema described by the artifact
    pub fn schema(&self) -> Result<FeatureSchema, FeatureError> {
        FeatureSchema::new(self.features.clone())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.model_identifier.trim().is_empty() {
            return Err("model_identifier is empty".to_string());
        }
        let schema = self.schema().map_err(|e| e.to_string())?;
        let n = schema.len();

        match &self.model {
            ModelSpec::AdditiveTrees { base_score, trees } => {
                if !base_score.is_finite() {
                    return Err("base_score is not finite".to_string());
                }
                if trees.is_empty() {
                    return Err("ensemble has no trees".to_string());
                }
                for (i, tree) in trees.iter().enumerate() {
                    tree.validate(n).map_err(|e| format!("tree {}: {}", i, e))?;
                }
            }
            ModelSpec::Linear {
                intercept,
                weights,
                reference,
            } => {
                if weights.len() != n || reference.len() != n {
                    return Err(format!(
                        "linear model has {} weights and {} reference values for {} features",
                        weights.len(),
                        reference.len(),
                        n
                    ));
                }
                if !intercept.is_finite()
                    || weights.iter().chain(reference.iter()).any(|v| !v.is_finite())
                {
                    return Err("linear model has non-finite parameters".to_string());
                }
            }
        }

        Ok(())
    }
}
