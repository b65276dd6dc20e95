//! Channel and package resolution
//!
//! Picks the package version to deploy for every step of a project, given
//! the channel the job targets, and falls back to a default channel when the
//! job allows it and the chosen channel has nothing to offer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};

use crate::deploy::cancel::Cancellation;
use crate::deploy::reporter::Reporter;
use crate::errors::OrchestratorError;
use crate::http::service::DeploymentService;
use crate::models::channel::Channel;
use crate::models::deployment::{EnvironmentDeployment, PackageDeploymentStep, ProjectDeployment};
use crate::models::environment::Environment;
use crate::models::project::{PackageStep, Project, ProjectStub};
use crate::models::release::Release;

/// Resolver options
#[derive(Debug, Clone)]
pub struct Options {
    /// Maximum projects resolved at the same time
    pub max_concurrent: usize,

    /// Packages requested per step
    pub package_take: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            package_take: 10,
        }
    }
}

/// A step left without a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionWarning {
    pub project_name: String,
    pub step_name: String,
    pub message: String,
}

impl ResolutionWarning {
    fn no_suitable_package(project_name: &str, step_name: &str) -> Self {
        Self {
            project_name: project_name.to_string(),
            step_name: step_name.to_string(),
            message: format!(
                "No suitable package found for step {} of project {}",
                step_name, project_name
            ),
        }
    }
}

/// Default channel and its packages, fetched at most once per job.
///
/// The outer `None` means no project needed the fallback yet.
type FallbackMemo = Option<Option<(Channel, Vec<PackageStep>)>>;

/// Resolves channels and packages against the remote service
#[derive(Clone)]
pub struct PackageResolver {
    service: Arc<dyn DeploymentService>,
    reporter: Arc<dyn Reporter>,
    options: Options,
}

impl PackageResolver {
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

    /// Packages per step for a channel filter, with the best match selected
    async fn resolve_steps(
        &self,
        project_id: &str,
        version_range: Option<&str>,
        version_tag: Option<&str>,
    ) -> Result<Vec<PackageStep>, OrchestratorError> {
        let mut steps = self
            .service
            .list_available_packages(project_id, version_range, version_tag, self.options.package_take)
            .await?;
        for step in &mut steps {
            step.select_best();
        }
        Ok(steps)
    }

    /// Resolve one project against an environment and an optional channel
    pub async fn resolve_project(
        &self,
        stub: &ProjectStub,
        environment: &Environment,
        channel_name: Option<&str>,
    ) -> Result<Project, OrchestratorError> {
        let channel = match channel_name.filter(|n| !n.is_empty()) {
            Some(name) => Some(
                self.service
                    .get_channel_by_name(&stub.id, name)
                    .await?
                    .ok_or_else(|| {
                        OrchestratorError::ResolutionError(format!(
                            "channel {} not found for project {}",
                            name, stub.name
                        ))
                    })?,
            ),
            None => None,
        };

        let steps = self
            .resolve_steps(
                &stub.id,
                channel.as_ref().and_then(|c| c.version_range.as_deref()),
                channel.as_ref().and_then(|c| c.version_tag.as_deref()),
            )
            .await?;

        for step in steps.iter().filter(|s| s.selected_package.is_none()) {
            let warning = ResolutionWarning::no_suitable_package(&stub.name, &step.step_name);
            warn!("{}", warning.message);
        }

        let current_release = self
            .service
            .get_deployed_release(&stub.id, &environment.id)
            .await?;
        let selected = needs_deployment(&steps, current_release.as_ref());

        debug!(
            "Resolved {}: {} steps, selected={}",
            stub.name,
            steps.len(),
            selected
        );

        Ok(Project {
            project_id: stub.id.clone(),
            project_name: stub.name.clone(),
            project_group_id: stub.project_group_id.clone(),
            lifecycle_id: stub.lifecycle_id.clone(),
            current_release,
            available_package_steps: steps,
            required_variables: stub.required_variables.clone(),
            channel,
            selected,
        })
    }

    /// Resolve many projects with bounded concurrency.
    ///
    /// Results keep the order of `stubs`; projects that fail to resolve are
    /// reported and left out.
    pub async fn resolve_projects(
        &self,
        stubs: Vec<ProjectStub>,
        environment: &Environment,
        channel_name: Option<&str>,
        cancel: &Cancellation,
    ) -> Result<Vec<Project>, OrchestratorError> {
        let total = stubs.len();
        if total == 0 {
            return Ok(Vec::new());
        }
        info!(
            "Resolving {} projects for {} ({} at a time)",
            total, environment.name, self.options.max_concurrent
        );

        let semaphore = Arc::new(Semaphore::new(self.options.max_concurrent.max(1)));
        let (tx, mut rx) = mpsc::channel(total);

        for (index, stub) in stubs.into_iter().enumerate() {
            let sem = Arc::clone(&semaphore);
            let tx = tx.clone();
            let resolver = self.clone();
            let environment = environment.clone();
            let channel_name = channel_name.map(str::to_string);
            let cancel = cancel.clone();

            tokio::spawn(async move {
                let result = tokio::select! {
                    _ = cancel.cancelled() => Err(OrchestratorError::Cancelled),
                    result = async {
                        let _permit = sem
                            .acquire()
                            .await
                            .map_err(|e| OrchestratorError::Internal(e.to_string()))?;
                        resolver
                            .resolve_project(&stub, &environment, channel_name.as_deref())
                            .await
                    } => result,
                };
                let _ = tx.send((index, stub.name, result)).await;
            });
        }
        drop(tx);

        // Single aggregation point for results and progress
        let mut resolved = Vec::with_capacity(total);
        let mut done = 0;
        while let Some((index, name, result)) = rx.recv().await {
            done += 1;
            match result {
                Ok(project) => resolved.push((index, project)),
                Err(OrchestratorError::Cancelled) => {}
                Err(e) => {
                    warn!("Failed to resolve {}: {}", name, e);
                    self.reporter
                        .write_line(&format!("Skipping {}: {}", name, e));
                }
            }
            self.reporter
                .write_progress(done, total, &format!("Resolved {}", name));
        }
        self.reporter.stop_animation();

        if cancel.is_cancelled() {
            return Err(OrchestratorError::Cancelled);
        }

        resolved.sort_by_key(|(index, _)| *index);
        Ok(resolved.into_iter().map(|(_, project)| project).collect())
    }

    /// Fill in concrete packages for every project of a job that needs them.
    ///
    /// Returns one warning per step that stays unresolved.
    pub async fn resolve_packages_for_deployment(
        &self,
        job: &mut EnvironmentDeployment,
        default_fallback_channel_name: Option<&str>,
    ) -> Result<Vec<ResolutionWarning>, OrchestratorError> {
        let fallback_name = if job.fallback_to_default_channel {
            default_fallback_channel_name.filter(|n| !n.is_empty())
        } else {
            None
        };

        let mut memo: FallbackMemo = None;
        let mut warnings = Vec::new();
        let job_channel = job.channel_name.clone();

        for project in job
            .project_deployments
            .iter_mut()
            .filter(|p| p.needs_package_resolution())
        {
            let project_warnings = self
                .resolve_project_deployment(project, &job_channel, fallback_name, &mut memo)
                .await?;
            warnings.extend(project_warnings);
        }

        for warning in &warnings {
            self.reporter.write_line(&warning.message);
        }
        Ok(warnings)
    }

    async fn resolve_project_deployment(
        &self,
        project: &mut ProjectDeployment,
        job_channel: &str,
        fallback_name: Option<&str>,
        memo: &mut FallbackMemo,
    ) -> Result<Vec<ResolutionWarning>, OrchestratorError> {
        // A replayed profile may only carry the channel name
        if project.channel_id.is_empty() {
            let name = if project.channel_name.is_empty() {
                job_channel
            } else {
                project.channel_name.as_str()
            };
            if !name.is_empty() {
                let channel = self
                    .service
                    .get_channel_by_name(&project.project_id, name)
                    .await?
                    .ok_or_else(|| {
                        OrchestratorError::ValidationError(format!(
                            "channel {} not found for project {}",
                            name, project.project_name
                        ))
                    })?;
                project.apply_channel(&channel);
            }
        }

        let mut steps = self
            .resolve_steps(
                &project.project_id,
                project.channel_version_range.as_deref(),
                project.channel_version_tag.as_deref(),
            )
            .await?;

        let missing = steps.is_empty() || steps.iter().any(|s| s.selected_package.is_none());
        if missing {
            if let Some(name) = fallback_name {
                if memo.is_none() {
                    *memo = Some(self.fetch_fallback(&project.project_id, name).await?);
                }
                if let Some(Some((channel, fallback_steps))) = memo.as_ref() {
                    info!(
                        "Falling back to channel {} for {}",
                        channel.name, project.project_name
                    );
                    project.apply_channel(channel);
                    steps = fallback_steps.clone();
                }
            }
        }

        let mut warnings = Vec::new();
        project.packages = merge_steps(&project.packages, &steps);
        for package in project.packages.iter().filter(|p| p.is_unresolved()) {
            let warning = ResolutionWarning::no_suitable_package(&project.project_name, &package.step_name);
            warn!("{}", warning.message);
            warnings.push(warning);
        }
        Ok(warnings)
    }

    async fn fetch_fallback(
        &self,
        project_id: &str,
        channel_name: &str,
    ) -> Result<Option<(Channel, Vec<PackageStep>)>, OrchestratorError> {
        let Some(channel) = self.service.get_channel_by_name(project_id, channel_name).await? else {
            warn!("Fallback channel {} not found for {}", channel_name, project_id);
            return Ok(None);
        };
        let steps = self
            .resolve_steps(
                project_id,
                channel.version_range.as_deref(),
                channel.version_tag.as_deref(),
            )
            .await?;
        Ok(Some((channel, steps)))
    }
}

/// Combine the requested steps with freshly resolved ones.
///
/// Steps are matched by id; when nothing was requested every resolved step
/// is taken. Unmatched steps end up with empty package fields.
fn merge_steps(requested: &[PackageDeploymentStep], resolved: &[PackageStep]) -> Vec<PackageDeploymentStep> {
    let to_deployment = |step: &PackageStep| PackageDeploymentStep {
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
    };

    if requested.is_empty() {
        return resolved.iter().map(to_deployment).collect();
    }

    requested
        .iter()
        .map(|wanted| {
            if !wanted.is_unresolved() {
                return wanted.clone();
            }
            match resolved.iter().find(|s| s.step_id == wanted.step_id) {
                Some(step) => to_deployment(step),
                None => PackageDeploymentStep {
                    package_id: String::new(),
                    package_name: String::new(),
                    ..wanted.clone()
                },
            }
        })
        .collect()
}

/// Whether the resolved packages differ from what is live.
///
/// Only the first step is compared against the live release.
pub fn needs_deployment(steps: &[PackageStep], current_release: Option<&Release>) -> bool {
    let Some(current) = current_release else {
        return true;
    };

    let Some(first) = steps.first() else {
        return false;
    };
    let resolved = first.selected_package.as_ref().map(|p| p.version.as_str());
    let deployed = current
        .package_for_step(&first.step_id)
        .map(|p| p.version.as_str());

    deployed.is_none() || resolved != deployed
}
