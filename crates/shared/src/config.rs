use std::time::Duration;

use thiserror::Error;

use crate::config_env::{
    optional_trimmed_env, parse_bool_env, parse_optional_usize_env, parse_u64_env,
    parse_usize_env,
};
use crate::llm::DEFAULT_RESPONSE_LANGUAGE;
use crate::session::HistoryReplayRole;

const DEFAULT_API_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_API_MAX_SESSIONS: usize = 1024;
const DEFAULT_API_MAX_DATASET_BYTES: usize = 5 * 1024 * 1024;
const DEFAULT_API_SESSION_IDLE_TTL_MS: u64 = 30 * 60 * 1000;
const DEFAULT_COMPLETION_TIMEOUT_MS: u64 = 60_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    MissingVar(String),
    #[error("invalid integer in env var {0}")]
    ParseInt(String),
    #[error("invalid boolean in env var {0}")]
    ParseBool(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("failed to load .env file: {0}")]
    DotEnv(String),
}

/// Loads a `.env` file from the working directory when one exists.
pub fn load_dotenv() -> Result<(), ConfigError> {
    match dotenvy::dotenv() {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(ConfigError::DotEnv(err.to_string())),
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: String,
    pub max_sessions: usize,
    pub max_dataset_bytes: usize,
    /// Sessions untouched for this long are evicted by the host.
    pub session_idle_ttl_ms: u64,
    pub session: SessionConfig,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            bind_addr: optional_trimmed_env("API_BIND_ADDR")
                .unwrap_or_else(|| DEFAULT_API_BIND_ADDR.to_string()),
            max_sessions: parse_usize_env("API_MAX_SESSIONS", DEFAULT_API_MAX_SESSIONS)?,
            max_dataset_bytes: parse_usize_env(
                "API_MAX_DATASET_BYTES",
                DEFAULT_API_MAX_DATASET_BYTES,
            )?,
            session_idle_ttl_ms: parse_u64_env(
                "API_SESSION_IDLE_TTL_MS",
                DEFAULT_API_SESSION_IDLE_TTL_MS,
            )?,
            session: SessionConfig::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_sessions == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "API_MAX_SESSIONS must be greater than 0".to_string(),
            ));
        }
        if self.max_dataset_bytes == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "API_MAX_DATASET_BYTES must be greater than 0".to_string(),
            ));
        }
        if self.session_idle_ttl_ms == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "API_SESSION_IDLE_TTL_MS must be greater than 0".to_string(),
            ));
        }
        self.session.validate()
    }

    pub fn session_idle_ttl(&self) -> Duration {
        Duration::from_millis(self.session_idle_ttl_ms)
    }
}

/// Per-session behaviour shared by every controller a host creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub completion_timeout_ms: u64,
    /// `None` replays the whole transcript.
    pub max_history_turns: Option<usize>,
    pub history_replay_role: HistoryReplayRole,
    pub replay_history_on_interpret: bool,
    pub response_language: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            completion_timeout_ms: DEFAULT_COMPLETION_TIMEOUT_MS,
            max_history_turns: None,
            history_replay_role: HistoryReplayRole::User,
            replay_history_on_interpret: false,
            response_language: DEFAULT_RESPONSE_LANGUAGE.to_string(),
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let history_replay_role = match optional_trimmed_env("SESSION_HISTORY_REPLAY_ROLE") {
            Some(raw) => HistoryReplayRole::parse(&raw).ok_or_else(|| {
                ConfigError::InvalidConfiguration(format!(
                    "SESSION_HISTORY_REPLAY_ROLE must be 'user' or 'assistant', got '{raw}'"
                ))
            })?,
            None => defaults.history_replay_role,
        };

        let config = Self {
            completion_timeout_ms: parse_u64_env(
                "SESSION_COMPLETION_TIMEOUT_MS",
                defaults.completion_timeout_ms,
            )?,
            max_history_turns: parse_optional_usize_env("SESSION_MAX_HISTORY_TURNS")?,
            history_replay_role,
            replay_history_on_interpret: parse_bool_env(
                "SESSION_REPLAY_HISTORY_ON_INTERPRET",
                defaults.replay_history_on_interpret,
            )?,
            response_language: optional_trimmed_env("SESSION_RESPONSE_LANGUAGE")
                .unwrap_or(defaults.response_language),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.completion_timeout_ms == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "SESSION_COMPLETION_TIMEOUT_MS must be greater than 0".to_string(),
            ));
        }
        if self.max_history_turns == Some(0) {
            return Err(ConfigError::InvalidConfiguration(
                "SESSION_MAX_HISTORY_TURNS must be greater than 0 when set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn completion_timeout(&self) -> Duration {
        Duration::from_millis(self.completion_timeout_ms)
    }
}
