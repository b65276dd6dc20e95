//! Deployment request models

use serde::{Deserialize, Serialize};

use crate::models::channel::Channel;
use crate::models::environment::Environment;
use crate::models::project::{Project, RequiredVariable};

/// Placeholder package reference meaning "resolve again at replay time"
pub const LATEST_PACKAGE: &str = "latest";

/// Package chosen for one deployment step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDeploymentStep {
    pub step_id: String,

    pub step_name: String,

    /// Package ID in the feed
    pub package_id: String,

    /// Package version selected for the step
    pub package_name: String,
}

impl PackageDeploymentStep {
    pub fn is_latest(&self) -> bool {
        self.package_id == LATEST_PACKAGE || self.package_name == LATEST_PACKAGE
    }

    pub fn is_unresolved(&self) -> bool {
        self.package_id.is_empty() || self.package_name.is_empty() || self.is_latest()
    }
}

/// Deployment intent for a single project
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDeployment {
    pub project_id: String,

    pub project_name: String,

    #[serde(default)]
    pub packages: Vec<PackageDeploymentStep>,

    #[serde(default)]
    pub required_variables: Vec<RequiredVariable>,

    #[serde(default)]
    pub channel_id: String,

    #[serde(default)]
    pub channel_name: String,

    #[serde(default)]
    pub channel_version_range: Option<String>,

    #[serde(default)]
    pub channel_version_tag: Option<String>,

    /// Notes attached to a newly created release
    #[serde(default)]
    pub release_message: String,

    /// Explicit release version, overrides derivation
    #[serde(default)]
    pub release_version: String,

    #[serde(default)]
    pub lifecycle_id: String,

    /// Existing release to deploy; empty means "create one"
    #[serde(default)]
    pub release_id: String,
}

impl ProjectDeployment {
    /// Make `channel` the effective channel of this deployment
    pub fn apply_channel(&mut self, channel: &Channel) {
        self.channel_id = channel.id.clone();
        self.channel_name = channel.name.clone();
        self.channel_version_range = channel.version_range.clone();
        self.channel_version_tag = channel.version_tag.clone();
    }

    /// Drop the resolved channel and packages so both resolve against `channel_name`
    pub fn retarget_channel(&mut self, channel_name: &str) {
        self.channel_id.clear();
        self.channel_name = channel_name.to_string();
        self.channel_version_range = None;
        self.channel_version_tag = None;
        for package in &mut self.packages {
            package.package_id = LATEST_PACKAGE.to_string();
            package.package_name = LATEST_PACKAGE.to_string();
        }
    }

    /// True when some step still needs a concrete package
    pub fn needs_package_resolution(&self) -> bool {
        self.release_id.is_empty()
            && (self.packages.is_empty()
                || self.packages.iter().any(PackageDeploymentStep::is_unresolved))
    }

    /// Copy with every package reference replaced by the replay sentinel
    pub fn with_latest_packages(&self) -> Self {
        let mut copy = self.clone();
        for package in &mut copy.packages {
            package.package_id = LATEST_PACKAGE.to_string();
            package.package_name = LATEST_PACKAGE.to_string();
        }
        copy
    }
}

/// A deployment job against one environment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentDeployment {
    pub environment_id: String,

    pub environment_name: String,

    #[serde(default)]
    pub project_deployments: Vec<ProjectDeployment>,

    #[serde(default)]
    pub channel_name: String,

    /// Submit every task and poll for results instead of checking one by one
    #[serde(default)]
    pub deploy_async: bool,

    /// Allow resolving against the default channel when the chosen one has no match
    #[serde(default)]
    pub fallback_to_default_channel: bool,

    #[serde(default)]
    pub prioritise: bool,
}

impl EnvironmentDeployment {
    /// Build a job from the projects flagged as needing deployment
    pub fn from_projects(
        environment: &Environment,
        channel_name: &str,
        projects: &[Project],
    ) -> Self {
        Self {
            environment_id: environment.id.clone(),
            environment_name: environment.name.clone(),
            project_deployments: projects
                .iter()
                .filter(|p| p.selected)
                .map(Project::to_deployment)
                .collect(),
            channel_name: channel_name.to_string(),
            ..Default::default()
        }
    }

    /// Point the job at another channel.
    ///
    /// Projects deploying an existing release keep it; the others resolve
    /// their channel and packages again.
    pub fn override_channel(&mut self, channel_name: &str) {
        self.channel_name = channel_name.to_string();
        for project in self
            .project_deployments
            .iter_mut()
            .filter(|p| p.release_id.is_empty())
        {
            project.retarget_channel(channel_name);
        }
    }

    /// Copy suitable for persisting as a replayable profile
    pub fn to_profile(&self) -> Self {
        Self {
            project_deployments: self
                .project_deployments
                .iter()
                .map(ProjectDeployment::with_latest_packages)
                .collect(),
            ..self.clone()
        }
    }
}
