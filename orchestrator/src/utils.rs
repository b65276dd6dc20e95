//! Utility functions

use serde::{Deserialize, Serialize};

/// Version information for the binary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// Join a platform-relative link onto the server base URL.
///
/// Links already carrying a scheme are returned unchanged.
pub fn join_url(base_url: &str, link: &str) -> String {
    if link.starts_with("http://") || link.starts_with("https://") {
        return link.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        link.trim_start_matches('/')
    )
}
