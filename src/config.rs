use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use crate::core::{Explainer, RateLimitConfig};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub model: ModelSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub explainer: ExplainerSettings,
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    pub auth: AuthSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

#[derive(Debug, Clone, Deserialize)]
pub struct ModelSettings {
    pub artifact_path: String,
    /// When set, the loaded model must use exactly these features, in order
    #[serde(default)]
    pub expected_features: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchingSettings {
    /// Feature sample scored when a request carries no overrides
    #[serde(default)]
    pub default_sample: HashMap<String, Value>,
    /// Values used for features a request leaves out
    #[serde(default)]
    pub feature_defaults: HashMap<String, f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExplainerSettings {
    #[serde(default = "default_strong_cutoff")]
    pub strong_cutoff: f64,
    #[serde(default = "default_moderate_cutoff")]
    pub moderate_cutoff: f64,
}

impl Default for ExplainerSettings {
    fn default() -> Self {
        Self {
            strong_cutoff: default_strong_cutoff(),
            moderate_cutoff: default_moderate_cutoff(),
        }
    }
}

fn default_strong_cutoff() -> f64 { 0.3 }
fn default_moderate_cutoff() -> f64 { 0.1 }

impl ExplainerSettings {
    pub fn explainer(&self) -> Explainer {
        Explainer::new(self.strong_cutoff, self.moderate_cutoff)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default = "default_max_tracked_clients")]
    pub max_tracked_clients: usize,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            capacity: default_capacity(),
            max_tracked_clients: default_max_tracked_clients(),
        }
    }
}

fn default_window_secs() -> u64 { 60 }
fn default_capacity() -> usize { 60 }
fn default_max_tracked_clients() -> usize { 10_000 }

impl RateLimitSettings {
    pub fn config(&self) -> RateLimitConfig {
        RateLimitConfig::default()
            .with_window(Duration::from_secs(self.window_secs))
            .with_capacity(self.capacity)
            .with_max_tracked_clients(self.max_tracked_clients)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    pub secret: String,
    #[serde(default)]
    pub issuer: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with RFQ_MATCH__)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., RFQ_MATCH__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("RFQ_MATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings = substitute_env_vars(settings)?;
        let settings: Settings = settings.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that deserialize fine but cannot be served
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.secret.trim().is_empty() {
            return Err(ConfigError::Message("auth.secret must not be empty".to_string()));
        }
        let e = &self.explainer;
        if !(e.moderate_cutoff > 0.0 && e.moderate_cutoff < e.strong_cutoff) {
            return Err(ConfigError::Message(format!(
                "explainer cutoffs must satisfy 0 < moderate ({}) < strong ({})",
                e.moderate_cutoff, e.strong_cutoff
            )));
        }
        if self.rate_limit.window_secs == 0 || self.rate_limit.capacity == 0 {
            return Err(ConfigError::Message(
                "rate_limit.window_secs and rate_limit.capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Let the bare `RFQ_MATCH_AUTH_SECRET` variable supply the signing secret
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    match std::env::var("RFQ_MATCH_AUTH_SECRET") {
        Ok(secret) => Config::builder()
            .add_source(settings)
            .set_override("auth.secret", secret)?
            .build(),
        Err(_) => Ok(settings),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> Settings {
        Config::builder()
            .set_override("model.artifact_path", "models/supplier_match.json")
            .unwrap()
            .set_override("auth.secret", "s3cret")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults_fill_optional_sections() {
        let settings = minimal();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.rate_limit.window_secs, 60);
        assert_eq!(settings.rate_limit.capacity, 60);
        assert_eq!(settings.explainer.strong_cutoff, 0.3);
        assert_eq!(settings.explainer.moderate_cutoff, 0.1);
        assert!(settings.matching.default_sample.is_empty());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_rate_limit_config_conversion() {
        let config = minimal().rate_limit.config();
        assert_eq!(config.window, Duration::from_secs(60));
        assert_eq!(config.capacity, 60);
        assert_eq!(config.max_tracked_clients, 10_000);
    }

    #[test]
    fn test_inverted_cutoffs_rejected() {
        let mut settings = minimal();
        settings.explainer.strong_cutoff = 0.05;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_empty_secret_rejected() {
        let mut settings = minimal();
        settings.auth.secret = "  ".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_default_logging() {
        let logging = LoggingSettings::default();
        assert_eq!(logging.level, "info");
        assert_eq!(logging.format, "json");
    }
}
