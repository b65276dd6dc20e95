//! Release models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::project::PackageRef;

/// An immutable, versioned bundle of selected package versions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub id: String,

    pub project_id: String,

    #[serde(default)]
    pub channel_id: Option<String>,

    pub version: String,

    #[serde(default)]
    pub selected_packages: Vec<PackageRef>,

    #[serde(default)]
    pub release_notes: Option<String>,

    #[serde(default)]
    pub last_modified_by: Option<String>,

    #[serde(default)]
    pub last_modified_on: Option<DateTime<Utc>>,
}

impl Release {
    /// Package pinned for the given step
    pub fn package_for_step(&self, step_id: &str) -> Option<&PackageRef> {
        self.selected_packages.iter().find(|p| p.step_id == step_id)
    }
}

/// One entry of a release's deployment history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseDeployment {
    pub id: String,

    pub release_id: String,

    pub environment_id: String,

    #[serde(default)]
    pub task_id: Option<String>,
}
