//! Lifecycle safety validation
//!
//! Decides, per project, whether promoting a release into the target
//! environment is allowed by the project's lifecycle phases.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::OrchestratorError;
use crate::http::service::DeploymentService;
use crate::models::deployment::{EnvironmentDeployment, ProjectDeployment};
use crate::models::lifecycle::{Lifecycle, Phase};

/// Outcome of a lifecycle check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentCheckResult {
    pub success: bool,

    #[serde(default)]
    pub error_message: Option<String>,
}

impl DeploymentCheckResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error_message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
        }
    }
}

/// Checks a job against the lifecycles of its projects
#[derive(Clone)]
pub struct LifecycleValidator {
    service: Arc<dyn DeploymentService>,
}

impl LifecycleValidator {
    pub fn new(service: Arc<dyn DeploymentService>) -> Self {
        Self { service }
    }

    /// Validate every project of the job, stopping at the first unsafe one
    pub async fn check_deployment(
        &self,
        job: &EnvironmentDeployment,
    ) -> Result<DeploymentCheckResult, OrchestratorError> {
        for project in &job.project_deployments {
            if !self.is_project_safe(project, &job.environment_id).await? {
                let environment = if job.environment_name.is_empty() {
                    &job.environment_id
                } else {
                    &job.environment_name
                };
                warn!(
                    "Lifecycle check failed for {} into {}",
                    project.project_name, environment
                );
                return Ok(DeploymentCheckResult::failed(format!(
                    "Project {} cannot be deployed to {}: the lifecycle does not allow promotion into this environment",
                    project.project_name, environment
                )));
            }
        }

        info!(
            "Lifecycle check passed for {} projects",
            job.project_deployments.len()
        );
        Ok(DeploymentCheckResult::ok())
    }

    async fn is_project_safe(
        &self,
        project: &ProjectDeployment,
        target_environment_id: &str,
    ) -> Result<bool, OrchestratorError> {
        let lifecycle = self.service.get_lifecycle(&project.lifecycle_id).await?;

        if lifecycle.phases.is_empty() {
            debug!("{} has no lifecycle phases, safe", project.project_name);
            return Ok(true);
        }

        if in_entry_phase(&lifecycle, target_environment_id) {
            debug!(
                "{} targets an entry phase environment, safe",
                project.project_name
            );
            return Ok(true);
        }

        let previous = self.previous_environments(project).await?;
        Ok(phase_gate(&lifecycle.phases, &previous, target_environment_id))
    }

    /// Environments the release being deployed already reached
    async fn previous_environments(
        &self,
        project: &ProjectDeployment,
    ) -> Result<BTreeSet<String>, OrchestratorError> {
        // A release that does not exist yet has no history
        if project.release_id.is_empty() {
            return Ok(BTreeSet::new());
        }

        let deployments = self
            .service
            .list_release_deployments(&project.release_id)
            .await?;
        Ok(deployments
            .into_iter()
            .map(|d| d.environment_id)
            .collect())
    }
}

/// Target listed by the first phase
pub fn in_entry_phase(lifecycle: &Lifecycle, target_environment_id: &str) -> bool {
    lifecycle
        .entry_phase()
        .is_some_and(|phase| phase.targets(target_environment_id))
}

/// Walk the mandatory phases in order; false on the first phase that blocks
pub fn phase_gate(phases: &[Phase], previous: &BTreeSet<String>, target_environment_id: &str) -> bool {
    for phase in phases.iter().filter(|p| !p.is_optional_phase) {
        let optional = &phase.optional_target_environment_ids;

        let passes = if phase.minimum_environments_before_promotion == 0 {
            previous.is_subset(optional) || optional.contains(target_environment_id)
        } else {
            let reached = previous.intersection(optional).count();
            phase.minimum_environments_before_promotion as usize <= reached
        };

        if !passes {
            debug!("Phase {} blocks promotion", phase.name);
            return false;
        }
    }
    true
}
