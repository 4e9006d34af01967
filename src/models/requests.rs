use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use validator::Validate;

/// Request to score and explain an RFQ–supplier match
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ExplainMatchRequest {
    #[validate(length(min = 1, max = 128))]
    #[serde(alias = "rfqIdentifier")]
    pub rfq_identifier: String,
    #[validate(length(min = 1, max = 128))]
    #[serde(default, alias = "supplierIdentifier")]
    pub supplier_identifier: Option<String>,
    /// Feature values replacing the configured default sample
    #[serde(default, alias = "featureOverrides")]
    pub feature_overrides: Option<HashMap<String, Value>>,
}
