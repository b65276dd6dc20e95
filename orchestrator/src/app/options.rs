//! Application configuration options

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::deploy::{cleanup, orchestrator, resolver};
use crate::storage::layout::StorageLayout;
use crate::storage::settings::Settings;
use crate::workers::task_poller;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Storage layout paths
    pub layout: StorageLayout,

    /// Platform connection
    pub server: ServerOptions,

    /// Lifetime of cached lookups
    pub cache_ttl: Duration,

    /// Channel consulted by jobs that opt into fallback
    pub default_fallback_channel: Option<String>,

    pub resolver: resolver::Options,

    pub orchestrator: orchestrator::Options,

    pub cleaner: cleanup::Options,
}

impl AppOptions {
    /// Derive runtime options from validated settings
    pub fn from_settings(layout: StorageLayout, settings: &Settings) -> Self {
        let deployment = &settings.deployment;
        Self {
            layout,
            server: ServerOptions {
                base_url: settings.server.base_url.clone(),
                api_key: SecretString::from(settings.server.api_key.expose_secret().to_string()),
                timeout: settings.server.timeout(),
            },
            cache_ttl: Duration::from_secs(settings.cache.ttl_secs),
            default_fallback_channel: settings.default_fallback_channel.clone(),
            resolver: resolver::Options {
                max_concurrent: deployment.max_concurrent_resolutions,
                package_take: deployment.package_take,
            },
            orchestrator: orchestrator::Options {
                poller: task_poller::Options {
                    interval: Duration::from_secs(deployment.poll_interval_secs),
                    batch_size: deployment.task_batch_size,
                    max_consecutive_failures: deployment.max_poll_failures,
                },
                poll_timeout: deployment.poll_timeout_secs.map(Duration::from_secs),
                fetch_failure_logs: deployment.fetch_failure_logs,
            },
            cleaner: cleanup::Options {
                package_take: deployment.package_take,
            },
        }
    }
}

/// Platform connection options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub base_url: String,

    pub api_key: SecretString,

    /// Per-request timeout
    pub timeout: Duration,
}
