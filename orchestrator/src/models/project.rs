//! Project and package models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::channel::Channel;
use crate::models::deployment::{PackageDeploymentStep, ProjectDeployment};
use crate::models::release::Release;

/// Lightweight project record as listed by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectStub {
    /// Unique project ID
    pub id: String,

    /// Project name
    pub name: String,

    /// Project group this project belongs to
    #[serde(default)]
    pub project_group_id: String,

    /// Lifecycle governing promotions
    #[serde(default)]
    pub lifecycle_id: String,

    /// Variables the project prompts for at deployment time
    #[serde(default)]
    pub required_variables: Vec<RequiredVariable>,
}

/// A project group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectGroup {
    pub id: String,
    pub name: String,
}

/// A prompted variable and, once collected, its answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredVariable {
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub value: Option<String>,
}

/// A package version published for a deployment step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRef {
    /// Package ID in the feed
    pub id: String,

    /// Package version string
    pub version: String,

    /// Step the package is deployed by
    #[serde(default)]
    pub step_id: String,

    #[serde(default)]
    pub step_name: String,

    #[serde(default)]
    pub published_on: Option<DateTime<Utc>>,
}

/// One deployable step of a project's process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageStep {
    pub step_id: String,

    pub step_name: String,

    /// Candidate packages, best match first
    #[serde(default)]
    pub available_packages: Vec<PackageRef>,

    /// Best match for the active channel filter, if any
    #[serde(default)]
    pub selected_package: Option<PackageRef>,
}

impl PackageStep {
    /// Pick the best candidate; the platform already orders them
    pub fn select_best(&mut self) -> Option<&PackageRef> {
        self.selected_package = self.available_packages.first().cloned();
        self.selected_package.as_ref()
    }
}

/// A project fully resolved against an environment and a channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub project_id: String,

    pub project_name: String,

    pub project_group_id: String,

    pub lifecycle_id: String,

    /// Release currently live in the environment the project was loaded for
    pub current_release: Option<Release>,

    pub available_package_steps: Vec<PackageStep>,

    pub required_variables: Vec<RequiredVariable>,

    /// Channel the packages were resolved against
    pub channel: Option<Channel>,

    /// Whether the resolved packages differ from what is live
    pub selected: bool,
}

impl Project {
    /// Build the deployment intent for this project
    pub fn to_deployment(&self) -> ProjectDeployment {
        let packages = self
            .available_package_steps
            .iter()
            .map(|step| PackageDeploymentStep {
                step_id: step.step_id.clone(),
                step_name: step.step_name.clone(),
                package_id: step
                    .selected_package
                    .as_ref()
                    .map(|p| p.id.clone())
                    .unwrap_or_default(),
                package_name: step
                    .selected_package
                    .as_ref()
                    .map(|p| p.version.clone())
                    .unwrap_or_default(),
            })
            .collect();

        let mut deployment = ProjectDeployment {
            project_id: self.project_id.clone(),
            project_name: self.project_name.clone(),
            packages,
            required_variables: self.required_variables.clone(),
            lifecycle_id: self.lifecycle_id.clone(),
            ..Default::default()
        };
        if let Some(channel) = &self.channel {
            deployment.apply_channel(channel);
        }
        deployment
    }
}
