use std::sync::Arc;
use thiserror::Error;

use crate::config::Settings;
use crate::core::{
    AuthGate, FeatureError, FeatureSchema, FeatureVectorBuilder, MatchError, MatchScorer, Matcher,
    ModelError, Monitor, RateLimiter,
};
use crate::services::HostProbe;

/// Reasons the service refuses to start
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("model schema rejected: {0}")]
    Schema(String),

    #[error("feature defaults rejected: {0}")]
    FeatureDefaults(#[from] FeatureError),

    #[error("configured default sample cannot be explained: {0}")]
    DefaultSample(#[source] MatchError),
}

/// Application state shared across all handlers
///
/// Built once before the server binds; the limiter and monitor live for the
/// whole process.
#[derive(Clone)]
pub struct AppState {
    pub matcher: Matcher,
    pub auth: Arc<AuthGate>,
    pub limiter: Arc<RateLimiter>,
    pub monitor: Arc<Monitor>,
    pub host: HostProbe,
}

impl AppState {
    pub fn new(matcher: Matcher, auth: AuthGate, limiter: RateLimiter) -> Self {
        Self {
            matcher,
            auth: Arc::new(auth),
            limiter: Arc::new(limiter),
            monitor: Arc::new(Monitor::new()),
            host: HostProbe::new(),
        }
    }

    /// Load the model and wire every component from configuration
    pub fn from_settings(settings: &Settings) -> Result<Self, StartupError> {
        let scorer = MatchScorer::load(&settings.model.artifact_path)?;
        if let Some(expected) = &settings.model.expected_features {
            scorer.ensure_features(expected).map_err(StartupError::Schema)?;
        }

        let schema: FeatureSchema = scorer
            .schema()
            .as_ref()
            .clone()
            .with_defaults(&settings.matching.feature_defaults)?;
        let builder = FeatureVectorBuilder::new(Arc::new(schema));

        let matcher = Matcher::new(
            builder,
            scorer,
            settings.explainer.explainer(),
            settings.matching.default_sample.clone(),
        );

        if !settings.matching.default_sample.is_empty() {
            let explanation = matcher
                .explain_match(matcher.default_sample())
                .map_err(StartupError::DefaultSample)?;
            tracing::info!(
                "Default sample scores {:.4} against baseline {:.4}",
                explanation.score,
                explanation.baseline
            );
        }

        let auth = AuthGate::new(&settings.auth.secret, settings.auth.issuer.clone());
        let limiter = RateLimiter::new(settings.rate_limit.config());

        Ok(Self::new(matcher, auth, limiter))
    }
}
