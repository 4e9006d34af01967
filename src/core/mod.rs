// Core algorithm exports
pub mod auth;
pub mod explainer;
pub mod features;
pub mod matcher;
pub mod model;
pub mod monitor;
pub mod rate_limit;
pub mod scorer;

pub use auth::{bearer_token, AuthClaims, AuthError, AuthGate};
pub use explainer::{ExplainError, Explainer, FeatureAttribution, MatchExplanation};
pub use features::{FeatureError, FeatureSchema, FeatureVector, FeatureVectorBuilder};
pub use matcher::{MatchError, Matcher};
pub use model::{ModelArtifact, ModelError};
pub use monitor::{ErrorKind, MetricsSnapshot, Monitor, ResourceUsage};
pub use rate_limit::{Admission, RateLimitConfig, RateLimiter};
pub use scorer::{Breakdown, MatchScorer, Prediction, ScoringError};
