//! Daemon configuration, stored as YAML.
//!
//! # Layout
//!
//! ```text
//! /etc/localtimed/config.yaml
//!
//! desktop_id: localtimed
//! distance_threshold: 1000
//! accuracy: city
//! agent:
//!   enabled: true
//!   path: /usr/libexec/geoclue-2.0/demos/agent
//!   args: []
//!   settle_ms: 500
//! timedate:
//!   interactive: false
//! ```
//!
//! Every key is optional; a missing key takes the default shown above.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::AccuracyLevel;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/localtimed/config.yaml";
pub const CONFIG_ENV: &str = "LOCALTIMED_CONFIG";

pub const DEFAULT_DESKTOP_ID: &str = "localtimed";
pub const DEFAULT_DISTANCE_THRESHOLD: u32 = 1000;
pub const DEFAULT_AGENT_PATH: &str = "/usr/libexec/geoclue-2.0/demos/agent";
pub const DEFAULT_AGENT_SETTLE_MS: u64 = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Caller identifier reported to the provider.
    pub desktop_id: String,
    /// Minimum movement, in meters, before the provider reports again.
    pub distance_threshold: u32,
    pub accuracy: AccuracyLevel,
    pub agent: AgentConfig,
    pub timedate: TimedateConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            desktop_id: DEFAULT_DESKTOP_ID.to_string(),
            distance_threshold: DEFAULT_DISTANCE_THRESHOLD,
            accuracy: AccuracyLevel::City,
            agent: AgentConfig::default(),
            timedate: TimedateConfig::default(),
        }
    }
}

/// Fallback consent agent, spawned only when the provider reports none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    pub enabled: bool,
    pub path: PathBuf,
    pub args: Vec<String>,
    /// Pause between spawning the agent and retrying Start.
    pub settle_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from(DEFAULT_AGENT_PATH),
            args: Vec::new(),
            settle_ms: DEFAULT_AGENT_SETTLE_MS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimedateConfig {
    /// Allow timedated to prompt for authorization.
    pub interactive: bool,
}

impl Config {
    /// Load and validate `path`.
    ///
    /// Returns `ConfigError::NotFound` if absent,
    /// `ConfigError::Parse` (with path + line context) if malformed YAML.
    pub fn load_at(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound {
                    path: path.to_path_buf(),
                })
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let config = Self::from_yaml(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`Config::load_at`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::load_at(path) {
            Err(ConfigError::NotFound { .. }) => Ok(Self::default()),
            other => other,
        }
    }

    pub fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
        // An empty document deserializes to unit, not to a mapping.
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.desktop_id.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "desktop_id",
                reason: "must not be empty".to_string(),
            });
        }
        if self.accuracy == AccuracyLevel::None {
            return Err(ConfigError::Invalid {
                key: "accuracy",
                reason: "`none` would never yield a location".to_string(),
            });
        }
        if self.agent.enabled && self.agent.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                key: "agent.path",
                reason: "must be set when the agent is enabled".to_string(),
            });
        }
        Ok(())
    }
}

/// Resolve the config path: explicit argument, then `$LOCALTIMED_CONFIG`,
/// then [`DEFAULT_CONFIG_PATH`].
pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    match std::env::var_os(CONFIG_ENV) {
        Some(value) if !value.is_empty() => PathBuf::from(value),
        _ => PathBuf::from(DEFAULT_CONFIG_PATH),
    }
}
