use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while turning a raw feature mapping into a [`FeatureVector`]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    #[error("feature schema mismatch: missing [{}], unexpected [{}]", .missing.join(", "), .unexpected.join(", "))]
    SchemaMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("invalid value for feature '{name}': {reason}")]
    InvalidValue { name: String, reason: String },

    #[error("invalid feature schema: {0}")]
    InvalidSchema(String),
}

/// How a feature's raw value is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Continuous,
    Boolean,
    Categorical { levels: u32 },
}

/// One named slot of the model input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDescriptor {
    pub name: String,
    pub kind: FeatureKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<f64>,
}

impl FeatureDescriptor {
    pub fn continuous(name: &str) -> Self {
        Self { name: name.to_string(), kind: FeatureKind::Continuous, default: None }
    }

    pub fn boolean(name: &str) -> Self {
        Self { name: name.to_string(), kind: FeatureKind::Boolean, default: None }
    }

    pub fn categorical(name: &str, levels: u32) -> Self {
        Self { name: name.to_string(), kind: FeatureKind::Categorical { levels }, default: None }
    }

    /// Coerce a raw JSON value into the numeric encoding the model expects
    pub fn coerce(&self, raw: &Value) -> Result<f64, FeatureError> {
        let invalid = |reason: String| FeatureError::InvalidValue {
            name: self.name.clone(),
            reason,
        };

        let value = match self.kind {
            FeatureKind::Continuous => match raw {
                Value::Number(n) => n
                    .as_f64()
                    .ok_or_else(|| invalid(format!("{} is not representable as f64", n)))?,
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| invalid(format!("'{}' is not a number", s)))?,
                other => return Err(invalid(format!("expected a number, got {}", other))),
            },
            FeatureKind::Boolean => match raw {
                Value::Bool(b) => {
                    if *b { 1.0 } else { 0.0 }
                }
                Value::Number(n) => match n.as_f64() {
                    Some(v) if v == 0.0 || v == 1.0 => v,
                    _ => return Err(invalid(format!("expected true/false or 0/1, got {}", n))),
                },
                other => return Err(invalid(format!("expected a boolean, got {}", other))),
            },
            FeatureKind::Categorical { levels } => {
                let v = raw
                    .as_f64()
                    .ok_or_else(|| invalid(format!("expected a category code, got {}", raw)))?;
                if v.fract() != 0.0 || v < 0.0 || v >= levels as f64 {
                    return Err(invalid(format!(
                        "category code {} outside 0..{}",
                        v, levels
                    )));
                }
                v
            }
        };

        if !value.is_finite() {
            return Err(invalid("value is not finite".to_string()));
        }

        Ok(value)
    }
}

/// Ordered, fixed set of features a model was trained on
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FeatureSchema {
    descriptors: Vec<FeatureDescriptor>,
}

impl FeatureSchema {
    /// Build a schema, rejecting empty, blank or duplicate names
    pub fn new(descriptors: Vec<FeatureDescriptor>) -> Result<Self, FeatureError> {
        if descriptors.is_empty() {
            return Err(FeatureError::InvalidSchema("schema has no features".to_string()));
        }

        let mut seen = HashSet::new();
        for d in &descriptors {
            if d.name.trim().is_empty() {
                return Err(FeatureError::InvalidSchema("blank feature name".to_string()));
            }
            if !seen.insert(d.name.as_str()) {
                return Err(FeatureError::InvalidSchema(format!(
                    "duplicate feature '{}'",
                    d.name
                )));
            }
            if let FeatureKind::Categorical { levels: 0 } = d.kind {
                return Err(FeatureError::InvalidSchema(format!(
                    "categorical feature '{}' has no levels",
                    d.name
                )));
            }
            if let Some(default) = d.default {
                d.coerce(&Value::from(default))?;
            }
        }

        Ok(Self { descriptors })
    }

    /// The 15-feature supplier-match schema
    pub fn reference() -> Self {
        Self {
            descriptors: vec![
                FeatureDescriptor::continuous("price"),
                FeatureDescriptor::continuous("lead_time"),
                FeatureDescriptor::continuous("supplier_rating"),
                FeatureDescriptor::continuous("rfq_length"),
                FeatureDescriptor::categorical("buyer_tier", 4),
                FeatureDescriptor::continuous("quantity"),
                FeatureDescriptor::continuous("urgency_score"),
                FeatureDescriptor::categorical("region", 8),
                FeatureDescriptor::continuous("past_success_rate"),
                FeatureDescriptor::continuous("negotiations_count"),
                FeatureDescriptor::continuous("previous_orders"),
                FeatureDescriptor::boolean("multimodal_rfq"),
                FeatureDescriptor::continuous("transcript_length"),
                FeatureDescriptor::categorical("industry_type", 12),
                FeatureDescriptor::continuous("quoted_suppliers"),
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn descriptors(&self) -> &[FeatureDescriptor] {
        &self.descriptors
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.descriptors.iter().map(|d| d.name.as_str())
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.descriptors.iter().position(|d| d.name == name)
    }

    /// Apply configured defaults for missing features
    pub fn with_defaults(mut self, defaults: &HashMap<String, f64>) -> Result<Self, FeatureError> {
        let mut unexpected: Vec<String> = defaults
            .keys()
            .filter(|name| self.position(name).is_none())
            .cloned()
            .collect();
        if !unexpected.is_empty() {
            unexpected.sort();
            return Err(FeatureError::SchemaMismatch {
                missing: vec![],
                unexpected,
            });
        }

        for d in &mut self.descriptors {
            if let Some(value) = defaults.get(&d.name) {
                d.coerce(&Value::from(*value))?;
                d.default = Some(*value);
            }
        }

        Ok(self)
    }
}

/// Fixed-order numeric model input
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    schema: Arc<FeatureSchema>,
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.schema.position(name).map(|i| self.values[i])
    }

    /// (name, value) pairs in schema order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.schema.names().zip(self.values.iter().copied())
    }
}

/// Validates raw feature mappings against a schema
#[derive(Debug, Clone)]
pub struct FeatureVectorBuilder {
    schema: Arc<FeatureSchema>,
}

impl FeatureVectorBuilder {
    pub fn new(schema: Arc<FeatureSchema>) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &Arc<FeatureSchema> {
        &self.schema
    }

    /// Build a vector from a name → value mapping
    ///
    /// The mapping must name exactly the schema's features; missing names are
    /// only filled when the descriptor carries a default.
    pub fn build(&self, raw: &HashMap<String, Value>) -> Result<FeatureVector, FeatureError> {
        let mut unexpected: Vec<String> = raw
            .keys()
            .filter(|name| self.schema.position(name).is_none())
            .cloned()
            .collect();
        unexpected.sort();

        let missing: Vec<String> = self
            .schema
            .descriptors()
            .iter()
            .filter(|d| !raw.contains_key(&d.name) && d.default.is_none())
            .map(|d| d.name.clone())
            .collect();

        if !missing.is_empty() || !unexpected.is_empty() {
            return Err(FeatureError::SchemaMismatch { missing, unexpected });
        }

        let values = self
            .schema
            .descriptors()
            .iter()
            .map(|d| match (raw.get(&d.name), d.default) {
                (Some(value), _) => d.coerce(value),
                (None, Some(default)) => Ok(default),
                // Unreachable: missing names without defaults were rejected above
                (None, None) => Err(FeatureError::SchemaMismatch {
                    missing: vec![d.name.clone()],
                    unexpected: vec![],
                }),
            })
            .collect::<Result<Vec<f64>, FeatureError>>()?;

        Ok(FeatureVector {
            schema: Arc::clone(&self.schema),
            values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> HashMap<String, Value> {
        serde_json::from_value(json!({
            "price": 70000,
            "lead_time": 12,
            "supplier_rating": 4.5,
            "rfq_length": 350,
            "buyer_tier": 2,
            "quantity": 500,
            "urgency_score": 0.7,
            "region": 3,
            "past_success_rate": 0.82,
            "negotiations_count": 2,
            "previous_orders": 14,
            "multimodal_rfq": true,
            "transcript_length": 1200,
            "industry_type": 4,
            "quoted_suppliers": 9
        }))
        .unwrap()
    }

    fn builder() -> FeatureVectorBuilder {
        FeatureVectorBuilder::new(Arc::new(FeatureSchema::reference()))
    }

    #[test]
    fn test_reference_schema_has_fifteen_features() {
        let schema = FeatureSchema::reference();
        assert_eq!(schema.len(), 15);
        assert_eq!(schema.names().next(), Some("price"));
        assert_eq!(schema.names().last(), Some("quoted_suppliers"));
    }

    #[test]
    fn test_build_orders_by_schema() {
        let vector = builder().build(&sample()).unwrap();
        assert_eq!(vector.len(), 15);
        assert_eq!(vector.values()[0], 70000.0);
        assert_eq!(vector.get("multimodal_rfq"), Some(1.0));
        assert_eq!(vector.get("quoted_suppliers"), Some(9.0));
        let schema = FeatureSchema::reference();
        let names: Vec<&str> = vector.iter().map(|(n, _)| n).collect();
        assert_eq!(names, schema.names().collect::<Vec<_>>());
    }

    #[test]
    fn test_missing_and_unexpected_are_listed() {
        let mut raw = sample();
        raw.remove("price");
        raw.remove("region");
        raw.insert("color".to_string(), json!(1));

        match builder().build(&raw) {
            Err(FeatureError::SchemaMismatch { missing, unexpected }) => {
                assert_eq!(missing, vec!["price", "region"]);
                assert_eq!(unexpected, vec!["color"]);
            }
            other => panic!("expected schema mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_configured_default_fills_missing() {
        let mut defaults = HashMap::new();
        defaults.insert("negotiations_count".to_string(), 0.0);
        let schema = FeatureSchema::reference().with_defaults(&defaults).unwrap();
        let builder = FeatureVectorBuilder::new(Arc::new(schema));

        let mut raw = sample();
        raw.remove("negotiations_count");
        let vector = builder.build(&raw).unwrap();
        assert_eq!(vector.get("negotiations_count"), Some(0.0));
    }

    #[test]
    fn test_default_for_unknown_feature_rejected() {
        let mut defaults = HashMap::new();
        defaults.insert("colour".to_string(), 1.0);
        assert!(matches!(
            FeatureSchema::reference().with_defaults(&defaults),
            Err(FeatureError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_numeric_string_accepted_for_continuous() {
        let mut raw = sample();
        raw.insert("price".to_string(), json!("71500.5"));
        let vector = builder().build(&raw).unwrap();
        assert_eq!(vector.get("price"), Some(71500.5));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let cases = [
            ("price", json!("cheap")),
            ("price", json!(true)),
            ("multimodal_rfq", json!(2)),
            ("region", json!(1.5)),
            ("region", json!(8)),
            ("buyer_tier", json!(-1)),
        ];

        for (name, value) in cases {
            let mut raw = sample();
            raw.insert(name.to_string(), value.clone());
            match builder().build(&raw) {
                Err(FeatureError::InvalidValue { name: n, .. }) => assert_eq!(n, name),
                other => panic!("{} = {} should be invalid, got {:?}", name, value, other),
            }
        }
    }

    #[test]
    fn test_boolean_accepts_integer_encoding() {
        let mut raw = sample();
        raw.insert("multimodal_rfq".to_string(), json!(0));
        let vector = builder().build(&raw).unwrap();
        assert_eq!(vector.get("multimodal_rfq"), Some(0.0));
    }

    #[test]
    fn test_duplicate_schema_names_rejected() {
        let result = FeatureSchema::new(vec![
            FeatureDescriptor::continuous("price"),
            FeatureDescriptor::continuous("price"),
        ]);
        assert!(matches!(result, Err(FeatureError::InvalidSchema(_))));
    }
}
