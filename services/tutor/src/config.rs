use aita_core::EnvelopeConfig;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// Catalog file to load. The bundled lessons are used when unset.
    pub catalog_path: Option<PathBuf>,
    pub event_log_path: PathBuf,
    pub actor_home_page: String,
    pub locale: String,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let catalog_path = std::env::var("AITA_CATALOG_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let event_log_path = std::env::var("AITA_EVENT_LOG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("aita_events.jsonl"));

        let defaults = EnvelopeConfig::default();

        let actor_home_page =
            std::env::var("AITA_ACTOR_HOMEPAGE").unwrap_or(defaults.actor_home_page);
        if !(actor_home_page.starts_with("http://") || actor_home_page.starts_with("https://")) {
            return Err(ConfigError::InvalidValue(
                "AITA_ACTOR_HOMEPAGE".to_string(),
                format!("'{}' is not an http(s) URL", actor_home_page),
            ));
        }

        let locale = std::env::var("AITA_LOCALE").unwrap_or(defaults.locale);
        if locale.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "AITA_LOCALE".to_string(),
                "locale must not be empty".to_string(),
            ));
        }

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            catalog_path,
            event_log_path,
            actor_home_page,
            locale,
            log_level,
        })
    }

    /// Builds the event envelope shared by every session.
    pub fn envelope(&self) -> EnvelopeConfig {
        EnvelopeConfig {
            actor_home_page: self.actor_home_page.clone(),
            locale: self.locale.clone(),
            ..Default::default()
        }
    }
}
