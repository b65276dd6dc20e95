//! Job orchestration
//!
//! Turns a validated, resolved job into deployment tasks on the platform.
//! Projects are submitted one after another; in asynchronous mode the tasks
//! are then tracked by the task poller until they finish.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use openapi_client::{CreateDeploymentRequest, CreateReleaseRequest, SelectedPackageRequest};
use serde::Serialize;
use tracing::{error, info, info_span, warn, Instrument};

use crate::deploy::cancel::Cancellation;
use crate::deploy::reporter::Reporter;
use crate::deploy::version::derive_release_version;
use crate::errors::OrchestratorError;
use crate::http::service::DeploymentService;
use crate::models::deployment::{EnvironmentDeployment, ProjectDeployment};
use crate::models::release::Release;
use crate::models::task::{DeploymentTask, TaskState};
use crate::utils::join_url;
use crate::workers::task_poller::{self, Registration, TaskRegistry};

/// Orchestrator options
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Task poller configuration
    pub poller: task_poller::Options,

    /// Upper bound on the time spent polling asynchronous tasks
    pub poll_timeout: Option<Duration>,

    /// Attach the raw task log to failure records
    pub fetch_failure_logs: bool,
}

/// A project whose deployment finished or was handed off
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentOutcome {
    pub project_id: String,
    pub project_name: String,
    pub task_id: Option<String>,
}

/// A project whose deployment failed
#[derive(Debug, Clone, Serialize)]
pub struct FailedDeployment {
    pub project_id: String,
    pub project_name: String,
    pub task: Option<DeploymentTask>,
    pub error: Option<String>,

    /// Absolute link to the task in the platform UI
    pub web_url: Option<String>,

    pub raw_log: Option<String>,
}

/// Result of one orchestration run
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrchestrationResult {
    pub run_id: String,
    pub environment_name: String,
    pub submitted: usize,
    pub succeeded: Vec<DeploymentOutcome>,
    pub failed: Vec<FailedDeployment>,

    /// Tasks whose final state was never observed
    pub unresolved: Vec<DeploymentOutcome>,

    /// Projects not submitted because the run was cancelled
    pub skipped: Vec<DeploymentOutcome>,

    pub cancelled: bool,

    /// Set when polling stopped because the platform kept failing
    pub polling_error: Option<String>,
}

/// Submits and tracks deployment tasks for a job
pub struct JobOrchestrator {
    service: Arc<dyn DeploymentService>,
    reporter: Arc<dyn Reporter>,
    options: Options,
}

impl JobOrchestrator {
    pub fn new(
        service: Arc<dyn DeploymentService>,
        reporter: Arc<dyn Reporter>,
        options: Options,
    ) -> Self {
        Self {
            service,
            reporter,
            options,
        }
    }

    /// Run a job to completion.
    ///
    /// Only upfront validation problems are returned as errors; per-project
    /// failures are collected in the result.
    pub async fn run(
        &self,
        job: EnvironmentDeployment,
        cancel: &Cancellation,
    ) -> Result<OrchestrationResult, OrchestratorError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = info_span!("orchestration", run_id = %run_id, environment = %job.environment_name);
        self.run_impl(run_id, job, cancel).instrument(span).await
    }

    async fn run_impl(
        &self,
        run_id: String,
        job: EnvironmentDeployment,
        cancel: &Cancellation,
    ) -> Result<OrchestrationResult, OrchestratorError> {
        self.validate(&job).await?;

        let mut result = OrchestrationResult {
            run_id,
            environment_name: job.environment_name.clone(),
            ..Default::default()
        };
        let mut registry = TaskRegistry::new();

        self.reporter.write_status_line(&format!(
            "Deploying {} projects to {}{}",
            job.project_deployments.len(),
            job.environment_name,
            if job.deploy_async { " (async)" } else { "" }
        ));

        for project in &job.project_deployments {
            if cancel.is_cancelled() {
                result.cancelled = true;
                result.skipped.push(DeploymentOutcome {
                    project_id: project.project_id.clone(),
                    project_name: project.project_name.clone(),
                    task_id: None,
                });
                continue;
            }

            let task = match self.submit(&job, project).await {
                Ok(task) => task,
                Err(e) => {
                    error!("Failed to deploy {}: {}", project.project_name, e);
                    self.reporter
                        .write_line(&format!("Failed to deploy {}: {}", project.project_name, e));
                    result.failed.push(FailedDeployment {
                        project_id: project.project_id.clone(),
                        project_name: project.project_name.clone(),
                        task: None,
                        error: Some(e.to_string()),
                        web_url: None,
                        raw_log: None,
                    });
                    continue;
                }
            };
            result.submitted += 1;

            if job.deploy_async {
                registry.register(Registration {
                    project_id: project.project_id.clone(),
                    project_name: project.project_name.clone(),
                    task,
                });
                continue;
            }

            // Synchronous mode observes the status once, right after creation
            if task.state == TaskState::Failed {
                let failure = self
                    .failure(&project.project_id, &project.project_name, task)
                    .await;
                result.failed.push(failure);
            } else {
                self.reporter.write_line(&format!(
                    "{} deployment task {} is {}",
                    project.project_name, task.id, task.state
                ));
                result.succeeded.push(DeploymentOutcome {
                    project_id: project.project_id.clone(),
                    project_name: project.project_name.clone(),
                    task_id: Some(task.id),
                });
            }
        }

        if !registry.is_empty() {
            let cancel = match self.options.poll_timeout {
                Some(timeout) => cancel.clone().with_timeout(timeout),
                None => cancel.clone(),
            };
            let outcome = task_poller::run(
                &self.options.poller,
                self.service.as_ref(),
                self.reporter.as_ref(),
                &mut registry,
                tokio::time::sleep,
                &cancel,
            )
            .await;

            result.succeeded.extend(outcome.succeeded.into_iter().map(outcome_of));
            for registration in outcome.failed {
                let failure = self
                    .failure(
                        &registration.project_id,
                        &registration.project_name,
                        registration.task,
                    )
                    .await;
                result.failed.push(failure);
            }
            result.unresolved.extend(outcome.missing.into_iter().map(outcome_of));
            result.polling_error = outcome.gave_up;
            if !outcome.abandoned.is_empty() {
                result.cancelled = result.polling_error.is_none();
                result
                    .unresolved
                    .extend(outcome.abandoned.into_iter().map(outcome_of));
            }
        }

        self.summarize(&result);
        Ok(result)
    }

    /// Checks that must pass before anything is mutated remotely
    async fn validate(&self, job: &EnvironmentDeployment) -> Result<(), OrchestratorError> {
        if job.environment_id.is_empty() {
            return Err(OrchestratorError::ValidationError(
                "the job has no target environment".to_string(),
            ));
        }
        if self.service.get_environment(&job.environment_id).await?.is_none() {
            return Err(OrchestratorError::ValidationError(format!(
                "environment {} does not exist",
                job.environment_id
            )));
        }
        if let Some(project) = job.project_deployments.iter().find(|p| p.project_id.is_empty()) {
            return Err(OrchestratorError::ValidationError(format!(
                "project {} has no id",
                project.project_name
            )));
        }
        Ok(())
    }

    /// Create or fetch the release, queue the deployment and read its status
    async fn submit(
        &self,
        job: &EnvironmentDeployment,
        project: &ProjectDeployment,
    ) -> Result<DeploymentTask, OrchestratorError> {
        let release = self.prepare_release(job, project).await?;

        let form_values: BTreeMap<String, String> = project
            .required_variables
            .iter()
            .filter_map(|v| v.value.as_ref().map(|value| (v.id.clone(), value.clone())))
            .collect();

        let request = CreateDeploymentRequest {
            project_id: project.project_id.clone(),
            environment_id: job.environment_id.clone(),
            release_id: release.id.clone(),
            form_values,
            queue_priority: job.prioritise,
        };
        let task_id = self.service.create_deployment_task(&request).await?;
        info!(
            "Queued {} {} to {} as task {}",
            project.project_name, release.version, job.environment_name, task_id
        );

        self.service.get_task(&task_id).await
    }

    async fn prepare_release(
        &self,
        job: &EnvironmentDeployment,
        project: &ProjectDeployment,
    ) -> Result<Release, OrchestratorError> {
        if !project.release_id.is_empty() {
            return self.service.get_release(&project.release_id).await;
        }

        let explicit = Some(project.release_version.as_str()).filter(|v| !v.is_empty());
        let channel_name = if project.channel_name.is_empty() {
            job.channel_name.as_str()
        } else {
            project.channel_name.as_str()
        };
        let first_package = project
            .packages
            .first()
            .filter(|p| !p.is_unresolved())
            .map(|p| p.package_name.as_str());
        let version = derive_release_version(first_package, explicit, Some(channel_name))?;

        if explicit.is_some() {
            if let Some(existing) = self
                .service
                .get_release_by_version(&project.project_id, &version)
                .await?
            {
                info!("Reusing release {} of {}", existing.version, project.project_name);
                return Ok(existing);
            }
        }

        let request = CreateReleaseRequest {
            project_id: project.project_id.clone(),
            version,
            channel_id: Some(project.channel_id.clone()).filter(|id| !id.is_empty()),
            selected_packages: project
                .packages
                .iter()
                .filter(|p| !p.is_unresolved())
                .map(|p| SelectedPackageRequest {
                    step_id: p.step_id.clone(),
                    step_name: p.step_name.clone(),
                    version: p.package_name.clone(),
                })
                .collect(),
            release_notes: Some(project.release_message.clone()).filter(|m| !m.is_empty()),
        };
        let release = self.service.create_release(&request).await?;
        info!("Created release {} of {}", release.version, project.project_name);
        Ok(release)
    }

    async fn failure(
        &self,
        project_id: &str,
        project_name: &str,
        task: DeploymentTask,
    ) -> FailedDeployment {
        let web_url = task
            .web_link()
            .map(|link| join_url(self.service.base_url(), link));

        let raw_log = if self.options.fetch_failure_logs {
            match self.service.get_task_raw_log(&task.id).await {
                Ok(log) => Some(log),
                Err(e) => {
                    warn!("Failed to fetch the log of task {}: {}", task.id, e);
                    None
                }
            }
        } else {
            None
        };

        FailedDeployment {
            project_id: project_id.to_string(),
            project_name: project_name.to_string(),
            error: task.error_message.clone(),
            task: Some(task),
            web_url,
            raw_log,
        }
    }

    fn summarize(&self, result: &OrchestrationResult) {
        self.reporter.stop_animation();

        for failure in &result.failed {
            let line = match (&failure.web_url, &failure.error) {
                (Some(url), _) => format!("{} failed: {}", failure.project_name, url),
                (None, Some(error)) => format!("{} failed: {}", failure.project_name, error),
                (None, None) => format!("{} failed", failure.project_name),
            };
            self.reporter.write_line(&line);
        }

        self.reporter.write_status_line(&format!(
            "{} succeeded, {} failed, {} unresolved{}",
            result.succeeded.len(),
            result.failed.len(),
            result.unresolved.len(),
            if result.cancelled { " (cancelled)" } else { "" }
        ));
        if let Some(error) = &result.polling_error {
            self.reporter
                .write_line(&format!("Stopped tracking deployments: {}", error));
        }
    }
}

fn outcome_of(registration: Registration) -> DeploymentOutcome {
    DeploymentOutcome {
        project_id: registration.project_id,
        project_name: registration.project_name,
        task_id: Some(registration.task.id),
    }
}
