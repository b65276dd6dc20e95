//! Channel models

use serde::{Deserialize, Serialize};

/// A named package-version filter a project's releases are built against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Unique channel ID
    pub id: String,

    /// Channel name
    pub name: String,

    /// Owning project
    #[serde(default)]
    pub project_id: String,

    /// Version range expression, e.g. `[2.0,3.0)`
    #[serde(default)]
    pub version_range: Option<String>,

    /// Pre-release tag expression
    #[serde(default)]
    pub version_tag: Option<String>,

    /// Whether this is the project's default channel
    #[serde(default)]
    pub is_default: bool,
}

/// Outcome of a channel delete request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelDeletion {
    pub success: bool,

    /// Versions of releases still referencing the channel
    #[serde(default)]
    pub blocking_releases: Vec<String>,
}

impl ChannelDeletion {
    pub fn deleted() -> Self {
        Self {
            success: true,
            blocking_releases: Vec::new(),
        }
    }

    pub fn refused(blocking_releases: Vec<String>) -> Self {
        Self {
            success: false,
            blocking_releases,
        }
    }
}
