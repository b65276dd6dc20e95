//! Channel garbage collection
//!
//! A channel is stale once none of the project's available packages passes
//! its version filter. Stale channels are deleted unless releases still
//! reference them.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::deploy::reporter::Reporter;
use crate::errors::OrchestratorError;
use crate::http::service::DeploymentService;
use crate::models::channel::Channel;
use crate::models::project::ProjectStub;

/// Cleaner options
#[derive(Debug, Clone)]
pub struct Options {
    /// Packages fetched per project when matching channels
    pub package_take: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self { package_take: 500 }
    }
}

/// A channel selected for deletion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelCandidate {
    pub project_id: String,
    pub project_name: String,
    pub channel_id: String,
    pub channel_name: String,
}

/// A deletion the platform refused
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefusedDeletion {
    pub project_name: String,
    pub channel_name: String,

    /// Versions of the releases still referencing the channel
    pub blocking_releases: Vec<String>,
}

/// Result of a cleanup pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupReport {
    pub test_mode: bool,
    pub candidates: Vec<ChannelCandidate>,
    pub deleted: Vec<ChannelCandidate>,
    pub refused: Vec<RefusedDeletion>,

    /// Projects or channels that could not be processed
    pub errors: Vec<String>,
}

impl CleanupReport {
    /// True when no deletion was refused and nothing errored
    pub fn all_succeeded(&self) -> bool {
        self.refused.is_empty() && self.errors.is_empty()
    }
}

/// Deletes channels that no longer match any available package
pub struct ChannelCleaner {
    service: Arc<dyn DeploymentService>,
    reporter: Arc<dyn Reporter>,
    options: Options,
}

impl ChannelCleaner {
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

    /// Scan the projects, optionally limited to groups whose name contains
    /// `group_filter`, and delete their stale channels.
    ///
    /// In test mode the candidates are only reported.
    pub async fn cleanup(
        &self,
        group_filter: Option<&str>,
        test_mode: bool,
    ) -> Result<CleanupReport, OrchestratorError> {
        let projects = self.target_projects(group_filter).await?;
        let mut report = CleanupReport {
            test_mode,
            ..Default::default()
        };

        self.reporter.write_status_line(&format!(
            "Checking channels of {} projects{}",
            projects.len(),
            if test_mode { " (test mode)" } else { "" }
        ));

        for (index, project) in projects.iter().enumerate() {
            self.reporter
                .write_progress(index + 1, projects.len(), &project.name);

            let stale = match self.stale_channels(project).await {
                Ok(stale) => stale,
                Err(e) => {
                    error!("Failed to check the channels of {}: {}", project.name, e);
                    report
                        .errors
                        .push(format!("{}: {}", project.name, e));
                    continue;
                }
            };

            for channel in stale {
                let candidate = ChannelCandidate {
                    project_id: project.id.clone(),
                    project_name: project.name.clone(),
                    channel_id: channel.id.clone(),
                    channel_name: channel.name.clone(),
                };
                report.candidates.push(candidate.clone());

                if test_mode {
                    self.reporter.clean_current_line();
                    self.reporter.write_line(&format!(
                        "Would delete channel {} of {}",
                        channel.name, project.name
                    ));
                    continue;
                }

                self.delete(project, &channel, candidate, &mut report).await;
            }
        }

        self.reporter.stop_animation();
        self.reporter.write_status_line(&format!(
            "{} stale channels, {} deleted, {} refused, {} errors",
            report.candidates.len(),
            report.deleted.len(),
            report.refused.len(),
            report.errors.len()
        ));
        Ok(report)
    }

    async fn delete(
        &self,
        project: &ProjectStub,
        channel: &Channel,
        candidate: ChannelCandidate,
        report: &mut CleanupReport,
    ) {
        self.reporter.clean_current_line();
        match self.service.delete_channel(channel).await {
            Ok(deletion) if deletion.success => {
                info!("Deleted channel {} of {}", channel.name, project.name);
                self.reporter.write_line(&format!(
                    "Deleted channel {} of {}",
                    channel.name, project.name
                ));
                report.deleted.push(candidate);
            }
            Ok(deletion) => {
                warn!(
                    "Channel {} of {} is still used by releases {:?}",
                    channel.name, project.name, deletion.blocking_releases
                );
                self.reporter.write_line(&format!(
                    "Cannot delete channel {} of {}, used by releases: {}",
                    channel.name,
                    project.name,
                    deletion.blocking_releases.join(", ")
                ));
                report.refused.push(RefusedDeletion {
                    project_name: project.name.clone(),
                    channel_name: channel.name.clone(),
                    blocking_releases: deletion.blocking_releases,
                });
            }
            Err(e) => {
                error!("Failed to delete channel {} of {}: {}", channel.name, project.name, e);
                self.reporter.write_line(&format!(
                    "Failed to delete channel {} of {}: {}",
                    channel.name, project.name, e
                ));
                report
                    .errors
                    .push(format!("{}/{}: {}", project.name, channel.name, e));
            }
        }
    }

    async fn target_projects(
        &self,
        group_filter: Option<&str>,
    ) -> Result<Vec<ProjectStub>, OrchestratorError> {
        let projects = self.service.list_projects().await?;
        let Some(filter) = group_filter.map(str::trim).filter(|f| !f.is_empty()) else {
            return Ok(projects);
        };

        let filter = filter.to_lowercase();
        let groups: BTreeSet<String> = self
            .service
            .list_project_groups()
            .await?
            .into_iter()
            .filter(|g| g.name.to_lowercase().contains(&filter))
            .map(|g| g.id)
            .collect();
        debug!("Group filter {} matched {} groups", filter, groups.len());

        Ok(projects
            .into_iter()
            .filter(|p| groups.contains(&p.project_group_id))
            .collect())
    }

    /// Channels of the project that no available package satisfies
    async fn stale_channels(&self, project: &ProjectStub) -> Result<Vec<Channel>, OrchestratorError> {
        let (channels, steps) = futures::try_join!(
            self.service.list_channels(&project.id),
            self.service
                .list_available_packages(&project.id, None, None, self.options.package_take),
        )?;

        let versions: BTreeSet<String> = steps
            .into_iter()
            .flat_map(|step| step.available_packages)
            .map(|package| package.version)
            .collect();

        let mut stale = Vec::new();
        for channel in channels {
            if !self.matches_any(&channel, &versions).await? {
                debug!("Channel {} of {} matches no package", channel.name, project.name);
                stale.push(channel);
            }
        }
        Ok(stale)
    }

    async fn matches_any(
        &self,
        channel: &Channel,
        versions: &BTreeSet<String>,
    ) -> Result<bool, OrchestratorError> {
        for version in versions {
            if self.service.validate_version(channel, version).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
