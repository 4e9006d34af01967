use serde::{Deserialize, Serialize};

use crate::core::features::FeatureDescriptor;
use crate::core::FeatureAttribution;

/// One entry of the ordered attribution list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub name: String,
    pub value: f64,
    pub rationale: String,
}

impl From<FeatureAttribution> for FeatureImportance {
    fn from(a: FeatureAttribution) -> Self {
        Self {
            name: a.name,
            value: a.value,
            rationale: a.rationale,
        }
    }
}

/// Response for the explain-match endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainMatchResponse {
    pub request_id: String,
    pub rfq_identifier: String,
    pub supplier_identifier: Option<String>,
    pub score: f64,
    pub baseline: f64,
    pub feature_importance: Vec<FeatureImportance>,
    pub model_identifier: String,
}

/// Loaded model description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfoResponse {
    pub model_identifier: String,
    pub baseline: f64,
    pub features: Vec<FeatureDescriptor>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub model_identifier: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
