//! Layered configuration: defaults, then `config.yaml`, then `DRYDOCK_*`
//! environment variables. Command-line flags are applied by the caller.

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::types::DEFAULT_DURATION_SECS;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Figment(Box<figment::Error>),

    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    #[error("could not determine config directory")]
    NoConfigDir,
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the Mesos master, e.g. `https://cluster.example/mesos`.
    #[serde(default = "default_master_url")]
    pub master_url: String,
    /// DC/OS ACS token, sent as `Authorization: token=...`.
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Per-request timeout. Unset leaves the transport default in place.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            master_url: default_master_url(),
            auth_token: None,
            request_timeout_secs: None,
            log_level: default_log_level(),
            maintenance: MaintenanceConfig::default(),
        }
    }
}

fn default_master_url() -> String {
    "http://leader.mesos:5050".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    #[serde(default = "default_duration_secs")]
    pub default_duration_secs: u64,
    #[serde(default)]
    pub status_failure: StatusFailurePolicy,
    /// Flush draining machines before `up` and schedule unscheduled
    /// machines before `down`. When off, such machines are skipped.
    #[serde(default = "default_true")]
    pub implicit_transitions: bool,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            default_duration_secs: default_duration_secs(),
            status_failure: StatusFailurePolicy::default(),
            implicit_transitions: true,
        }
    }
}

fn default_duration_secs() -> u64 {
    DEFAULT_DURATION_SECS
}

fn default_true() -> bool {
    true
}

/// What to do when `maintenance/status` cannot be fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFailurePolicy {
    #[default]
    Fail,
    AssumeUp,
}

impl Config {
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("drydock").join("config.yaml"))
    }

    /// Load from `path`, which must exist, or from the default location,
    /// which may be absent.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) if !p.exists() => {
                return Err(ConfigError::FileNotFound(p.display().to_string()))
            }
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Yaml::file(file))
            .merge(Env::prefixed("DRYDOCK_").split("__"));
        figment.extract().map_err(ConfigError::from)
    }

    /// Parse a YAML document on top of the defaults.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Yaml::string(content))
            .extract()
            .map_err(ConfigError::from)
    }
}
