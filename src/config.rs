//! Client configuration.
//!
//! Values resolve from, highest precedence first: explicit overrides (CLI
//! flags), the environment, an optional JSON file, then defaults.

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use answer_api::{AnswerApiConfig, DEFAULT_BASE_URL};
use serde::Deserialize;

use crate::core::executor::{DeadlinePolicy, ExecutorConfig};
use crate::core::reveal::RevealConfig;

pub const API_URL_ENV_VAR: &str = "LEGAL_QA_API_URL";
pub const CONFIG_PATH_ENV_VAR: &str = "LEGAL_QA_CONFIG_PATH";

/// Upper bound for every second-valued timeout and deadline.
pub const MAX_TIMEOUT_SEC: u64 = 24 * 60 * 60;
pub const MAX_BACKOFF_BASE_MS: u64 = 60 * 60 * 1_000;
pub const MAX_REVEAL_PACE_MS: u64 = 60 * 1_000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub attempt_timeout_sec: u64,
    pub deadline_short_sec: u64,
    pub deadline_standard_sec: u64,
    pub deadline_long_sec: u64,
    pub reveal_pace_ms: u64,
    pub instant_reveal_above: Option<usize>,
    /// Extra request headers for the answering service, e.g. credentials.
    pub headers: BTreeMap<String, String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_BASE_URL.to_string(),
            max_attempts: 3,
            backoff_base_ms: 1_000,
            attempt_timeout_sec: 20,
            deadline_short_sec: 30,
            deadline_standard_sec: 45,
            deadline_long_sec: 60,
            reveal_pace_ms: 30,
            instant_reveal_above: None,
            headers: BTreeMap::new(),
        }
    }
}

/// Partial configuration: one JSON file or one set of CLI overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigLayer {
    pub api_url: Option<String>,
    pub max_attempts: Option<u32>,
    pub backoff_base_ms: Option<u64>,
    pub attempt_timeout_sec: Option<u64>,
    pub deadline_short_sec: Option<u64>,
    pub deadline_standard_sec: Option<u64>,
    pub deadline_long_sec: Option<u64>,
    pub reveal_pace_ms: Option<u64>,
    pub instant_reveal_above: Option<usize>,
    pub headers: Option<BTreeMap<String, String>>,
}

impl ConfigLayer {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_env() -> Self {
        Self {
            api_url: env_string_opt(API_URL_ENV_VAR),
            ..Self::default()
        }
    }
}

impl ClientConfig {
    /// Resolves configuration for this process.
    ///
    /// `config_path` takes priority over `LEGAL_QA_CONFIG_PATH`.
    pub fn load(config_path: Option<&Path>, overrides: &ConfigLayer) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let file_path = config_path
            .map(Path::to_path_buf)
            .or_else(|| env_string_opt(CONFIG_PATH_ENV_VAR).map(PathBuf::from));
        if let Some(path) = file_path {
            config.apply(&ConfigLayer::from_file(&path)?);
        }
        config.apply(&ConfigLayer::from_env());
        config.apply(overrides);

        config.validate()?;
        Ok(config)
    }

    /// Overwrites every field `layer` sets.
    pub fn apply(&mut self, layer: &ConfigLayer) {
        if let Some(api_url) = layer.api_url.as_deref() {
            self.api_url = api_url.trim().to_string();
        }
        apply_field(&mut self.max_attempts, layer.max_attempts);
        apply_field(&mut self.backoff_base_ms, layer.backoff_base_ms);
        apply_field(&mut self.attempt_timeout_sec, layer.attempt_timeout_sec);
        apply_field(&mut self.deadline_short_sec, layer.deadline_short_sec);
        apply_field(&mut self.deadline_standard_sec, layer.deadline_standard_sec);
        apply_field(&mut self.deadline_long_sec, layer.deadline_long_sec);
        apply_field(&mut self.reveal_pace_ms, layer.reveal_pace_ms);
        if layer.instant_reveal_above.is_some() {
            self.instant_reveal_above = layer.instant_reveal_above;
        }
        if let Some(headers) = &layer.headers {
            self.headers = headers.clone();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.api_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(invalid("api_url", format!("expected an http(s) URL, got '{url}'")));
        }
        if self.max_attempts == 0 {
            return Err(invalid("max_attempts", "must be at least 1"));
        }
        for (field, value) in [
            ("attempt_timeout_sec", self.attempt_timeout_sec),
            ("deadline_short_sec", self.deadline_short_sec),
            ("deadline_standard_sec", self.deadline_standard_sec),
            ("deadline_long_sec", self.deadline_long_sec),
        ] {
            if value == 0 {
                return Err(invalid(field, "must be greater than zero"));
            }
            if value > MAX_TIMEOUT_SEC {
                return Err(invalid(field, format!("must not exceed {MAX_TIMEOUT_SEC}")));
            }
        }
        if self.backoff_base_ms > MAX_BACKOFF_BASE_MS {
            return Err(invalid(
                "backoff_base_ms",
                format!("must not exceed {MAX_BACKOFF_BASE_MS}"),
            ));
        }
        if self.reveal_pace_ms > MAX_REVEAL_PACE_MS {
            return Err(invalid(
                "reveal_pace_ms",
                format!("must not exceed {MAX_REVEAL_PACE_MS}"),
            ));
        }
        Ok(())
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig::default()
            .with_max_attempts(self.max_attempts)
            .with_backoff_base(Duration::from_millis(self.backoff_base_ms))
            .with_attempt_timeout(Duration::from_secs(self.attempt_timeout_sec))
            .with_deadlines(DeadlinePolicy {
                short: Duration::from_secs(self.deadline_short_sec),
                standard: Duration::from_secs(self.deadline_standard_sec),
                long: Duration::from_secs(self.deadline_long_sec),
            })
    }

    pub fn reveal_config(&self) -> RevealConfig {
        RevealConfig {
            pace: Duration::from_millis(self.reveal_pace_ms),
            instant_above: self.instant_reveal_above,
        }
    }

    pub fn answer_api_config(&self) -> AnswerApiConfig {
        let attempt_timeout = Duration::from_secs(self.attempt_timeout_sec);
        AnswerApiConfig::new(self.api_url.clone())
            .with_headers(self.headers.clone())
            .with_connect_timeout(attempt_timeout)
            .with_timeout(attempt_timeout)
    }
}

fn apply_field<T: Copy>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}
