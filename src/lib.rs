//! RFQ Match - Explainable supplier-match scoring service
//!
//! This library scores how well a supplier fits a buyer's request for quotation
//! and explains the score feature by feature. Requests pass through bearer-token
//! authentication and a per-client sliding-window rate limit before scoring.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

// Re-export commonly used types
pub use crate::core::{AuthGate, Explainer, FeatureSchema, MatchExplanation, MatchScorer, Matcher, RateLimiter};
pub use models::{ExplainMatchRequest, ExplainMatchResponse, FeatureImportance};
pub use state::{AppState, StartupError};
