//! API models

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Paged collection returned by list endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceCollection<T> {
    pub items: Vec<T>,

    #[serde(default)]
    pub total_results: usize,

    #[serde(default)]
    pub items_per_page: usize,
}

impl<T> ResourceCollection<T> {
    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

/// Package pinned to a deployment step when creating a release
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedPackageRequest {
    pub step_id: String,
    pub step_name: String,
    pub version: String,
}

/// Create release request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReleaseRequest {
    pub project_id: String,
    pub version: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,

    #[serde(default)]
    pub selected_packages: Vec<SelectedPackageRequest>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_notes: Option<String>,
}

/// Rename release request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameReleaseRequest {
    pub version: String,
}

/// Create deployment request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDeploymentRequest {
    pub project_id: String,
    pub environment_id: String,
    pub release_id: String,

    /// Prompted variable answers keyed by variable id
    #[serde(default)]
    pub form_values: BTreeMap<String, String>,

    /// Ask the server to run the task ahead of the queue
    #[serde(default)]
    pub queue_priority: bool,
}

/// Create deployment response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDeploymentResponse {
    pub id: String,
    pub task_id: String,
}

/// Channel version validation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionValidationRequest {
    pub version: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_range: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_release_tag: Option<String>,
}

/// Channel version validation response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionValidationResponse {
    pub satisfies_version_range: bool,

    #[serde(default = "default_true")]
    pub satisfies_pre_release_tag: bool,
}

impl VersionValidationResponse {
    pub fn is_valid(&self) -> bool {
        self.satisfies_version_range && self.satisfies_pre_release_tag
    }
}

fn default_true() -> bool {
    true
}
