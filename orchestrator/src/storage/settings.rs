//! Settings file management

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::errors::OrchestratorError;
use crate::logs::LogLevel;

/// Rollout settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Release platform connection
    #[serde(default)]
    pub server: ServerSettings,

    /// Channel consulted when a job opts into fallback resolution
    #[serde(default)]
    pub default_fallback_channel: Option<String>,

    /// Deployment tuning
    #[serde(default)]
    pub deployment: DeploymentSettings,

    /// Response cache
    #[serde(default)]
    pub cache: CacheSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            server: ServerSettings::default(),
            default_fallback_channel: None,
            deployment: DeploymentSettings::default(),
            cache: CacheSettings::default(),
        }
    }
}

impl Settings {
    /// Reject settings that would fail before the first remote call
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        if self.server.base_url.trim().is_empty() {
            return Err(OrchestratorError::ConfigError(
                "server.base_url is not set".to_string(),
            ));
        }
        if self.server.api_key.expose_secret().trim().is_empty() {
            return Err(OrchestratorError::ConfigError(
                "server.api_key is not set".to_string(),
            ));
        }
        if self.deployment.task_batch_size == 0 {
            return Err(OrchestratorError::ConfigError(
                "deployment.task_batch_size must be greater than zero".to_string(),
            ));
        }
        if self.deployment.max_poll_failures == 0 {
            return Err(OrchestratorError::ConfigError(
                "deployment.max_poll_failures must be greater than zero".to_string(),
            ));
        }
        if self.deployment.max_concurrent_resolutions == 0 {
            return Err(OrchestratorError::ConfigError(
                "deployment.max_concurrent_resolutions must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Release platform API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Base URL of the platform, also used to build task links
    #[serde(default = "default_server_url")]
    pub base_url: String,

    /// API key sent with every request; never written back to disk
    #[serde(default = "empty_secret", skip_serializing)]
    pub api_key: SecretString,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_server_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn empty_secret() -> SecretString {
    SecretString::from(String::new())
}

fn default_timeout_secs() -> u64 {
    30
}

impl ServerSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            base_url: default_server_url(),
            api_key: empty_secret(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Deployment tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentSettings {
    /// Seconds between task polling rounds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Recent tasks fetched per polling round
    #[serde(default = "default_task_batch_size")]
    pub task_batch_size: usize,

    /// Give up polling after this many seconds; `null` polls until done
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: Option<u64>,

    /// Projects resolved concurrently
    #[serde(default = "default_max_concurrent_resolutions")]
    pub max_concurrent_resolutions: usize,

    /// Packages fetched per step
    #[serde(default = "default_package_take")]
    pub package_take: usize,

    /// Polling rounds allowed to fail in a row before giving up
    #[serde(default = "default_max_poll_failures")]
    pub max_poll_failures: usize,

    /// Attach the raw task log to failed deployments
    #[serde(default)]
    pub fetch_failure_logs: bool,
}

fn default_poll_interval() -> u64 {
    3
}

fn default_task_batch_size() -> usize {
    100
}

fn default_poll_timeout() -> Option<u64> {
    Some(3600)
}

fn default_max_concurrent_resolutions() -> usize {
    5
}

fn default_package_take() -> usize {
    500
}

fn default_max_poll_failures() -> usize {
    10
}

impl Default for DeploymentSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            task_batch_size: default_task_batch_size(),
            poll_timeout_secs: default_poll_timeout(),
            max_concurrent_resolutions: default_max_concurrent_resolutions(),
            package_take: default_package_take(),
            max_poll_failures: default_max_poll_failures(),
            fetch_failure_logs: false,
        }
    }
}

/// Cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Lifetime of cached lookups in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_ttl_secs() -> u64 {
    60
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
        }
    }
}
