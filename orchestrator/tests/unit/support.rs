//! In-memory platform and recording reporter shared by the unit tests

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use openapi_client::{CreateDeploymentRequest, CreateReleaseRequest};

use rollout::deploy::reporter::Reporter;
use rollout::errors::OrchestratorError;
use rollout::http::service::DeploymentService;
use rollout::models::channel::{Channel, ChannelDeletion};
use rollout::models::environment::Environment;
use rollout::models::lifecycle::{Lifecycle, Phase};
use rollout::models::project::{PackageRef, PackageStep, ProjectGroup, ProjectStub};
use rollout::models::release::{Release, ReleaseDeployment};
use rollout::models::task::{DeploymentTask, TaskState, WEB_LINK};

pub const BASE_URL: &str = "https://deploy.example.com";

/// Mutable platform contents
#[derive(Default)]
pub struct FakeState {
    pub environments: Vec<Environment>,
    pub projects: Vec<ProjectStub>,
    pub groups: Vec<ProjectGroup>,
    pub channels: Vec<Channel>,
    pub lifecycles: HashMap<String, Lifecycle>,

    /// Unfiltered packages per project
    pub packages: HashMap<String, Vec<PackageStep>>,

    pub releases: Vec<Release>,

    /// Release versions still referencing a channel, by channel id
    pub channel_releases: HashMap<String, Vec<String>>,

    /// Live release per (project id, environment id)
    pub deployed: HashMap<(String, String), Release>,

    pub release_deployments: HashMap<String, Vec<ReleaseDeployment>>,

    /// State a project's task reports once it shows up in the recent list
    pub task_outcomes: HashMap<String, TaskState>,

    /// State a freshly created task reports
    pub initial_task_state: Option<TaskState>,

    /// Projects whose deployment request is rejected
    pub failing_projects: Vec<String>,

    pub tasks: Vec<(String, DeploymentTask)>,
    pub deployment_requests: Vec<CreateDeploymentRequest>,
    pub release_requests: Vec<CreateReleaseRequest>,
    pub deleted_channels: Vec<String>,
    pub history_lookups: usize,
    pub package_lookups: usize,

    /// Listing recent tasks fails while set
    pub task_listing_down: bool,
    pub task_listings: usize,
}

/// `DeploymentService` backed by `FakeState`
#[derive(Default)]
pub struct FakeService {
    pub state: Mutex<FakeState>,
}

impl FakeService {
    pub fn new(state: FakeState) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(state),
        })
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }
}

pub fn environment(id: &str, name: &str) -> Environment {
    Environment::new(id, name)
}

pub fn project(id: &str, name: &str) -> ProjectStub {
    ProjectStub {
        id: id.to_string(),
        name: name.to_string(),
        project_group_id: "ProjectGroups-1".to_string(),
        lifecycle_id: "Lifecycles-1".to_string(),
        required_variables: Vec::new(),
    }
}

pub fn channel(id: &str, name: &str, project_id: &str, range: Option<&str>) -> Channel {
    Channel {
        id: id.to_string(),
        name: name.to_string(),
        project_id: project_id.to_string(),
        version_range: range.map(str::to_string),
        version_tag: None,
        is_default: false,
    }
}

pub fn package(step_id: &str, version: &str) -> PackageRef {
    PackageRef {
        id: format!("pkg-{}", step_id),
        version: version.to_string(),
        step_id: step_id.to_string(),
        step_name: format!("Deploy {}", step_id),
        published_on: None,
    }
}

/// A step offering `versions`, best match first
pub fn step(step_id: &str, versions: &[&str]) -> PackageStep {
    PackageStep {
        step_id: step_id.to_string(),
        step_name: format!("Deploy {}", step_id),
        available_packages: versions.iter().map(|v| package(step_id, v)).collect(),
        selected_package: None,
    }
}

pub fn phase(minimum: u32, optional: &[&str]) -> Phase {
    Phase {
        id: format!("phase-{}", minimum),
        name: format!("Phase {}", minimum),
        optional_target_environment_ids: optional.iter().map(|s| s.to_string()).collect(),
        minimum_environments_before_promotion: minimum,
        ..Default::default()
    }
}

pub fn lifecycle(id: &str, phases: Vec<Phase>) -> Lifecycle {
    Lifecycle {
        id: id.to_string(),
        name: id.to_string(),
        phases,
    }
}

fn numbers(version: &str) -> Vec<u64> {
    version
        .split('-')
        .next()
        .unwrap_or_default()
        .split('.')
        .map(|part| part.parse().unwrap_or(0))
        .collect()
}

fn compare(a: &str, b: &str) -> std::cmp::Ordering {
    let (mut a, mut b) = (numbers(a), numbers(b));
    let len = a.len().max(b.len());
    a.resize(len, 0);
    b.resize(len, 0);
    a.cmp(&b)
}

/// Interval-notation range and pre-release tag matching, e.g. `[1.0,2.0)`
pub fn version_matches(range: Option<&str>, tag: Option<&str>, version: &str) -> bool {
    if let Some(tag) = tag.filter(|t| !t.is_empty()) {
        if !version.contains(&format!("-{}", tag)) {
            return false;
        }
    }
    let Some(range) = range.map(str::trim).filter(|r| !r.is_empty()) else {
        return true;
    };
    if !range.starts_with(['[', '(']) {
        return compare(version, range).is_ge();
    }

    let inclusive_low = range.starts_with('[');
    let inclusive_high = range.ends_with(']');
    let inner = &range[1..range.len() - 1];
    let (low, high) = inner.split_once(',').unwrap_or((inner, inner));
    let (low, high) = (low.trim(), high.trim());

    let above = low.is_empty()
        || match compare(version, low) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Equal => inclusive_low,
            std::cmp::Ordering::Less => false,
        };
    let below = high.is_empty()
        || match compare(version, high) {
            std::cmp::Ordering::Less => true,
            std::cmp::Ordering::Equal => inclusive_high,
            std::cmp::Ordering::Greater => false,
        };
    above && below
}

#[async_trait]
impl DeploymentService for FakeService {
    fn base_url(&self) -> &str {
        BASE_URL
    }

    async fn list_environments(&self) -> Result<Vec<Environment>, OrchestratorError> {
        Ok(self.with(|s| s.environments.clone()))
    }

    async fn get_environment(
        &self,
        id_or_name: &str,
    ) -> Result<Option<Environment>, OrchestratorError> {
        Ok(self.with(|s| s.environments.iter().find(|e| e.matches(id_or_name)).cloned()))
    }

    async fn list_projects(&self) -> Result<Vec<ProjectStub>, OrchestratorError> {
        Ok(self.with(|s| s.projects.clone()))
    }

    async fn get_project(&self, project_id: &str) -> Result<Option<ProjectStub>, OrchestratorError> {
        Ok(self.with(|s| s.projects.iter().find(|p| p.id == project_id).cloned()))
    }

    async fn list_project_groups(&self) -> Result<Vec<ProjectGroup>, OrchestratorError> {
        Ok(self.with(|s| s.groups.clone()))
    }

    async fn get_channel_by_name(
        &self,
        project_id: &str,
        name: &str,
    ) -> Result<Option<Channel>, OrchestratorError> {
        Ok(self.with(|s| {
            s.channels
                .iter()
                .find(|c| c.project_id == project_id && c.name.eq_ignore_ascii_case(name))
                .cloned()
        }))
    }

    async fn list_channels(&self, project_id: &str) -> Result<Vec<Channel>, OrchestratorError> {
        Ok(self.with(|s| {
            s.channels
                .iter()
                .filter(|c| c.project_id == project_id)
                .cloned()
                .collect()
        }))
    }

    async fn validate_version(
        &self,
        channel: &Channel,
        version: &str,
    ) -> Result<bool, OrchestratorError> {
        Ok(version_matches(
            channel.version_range.as_deref(),
            channel.version_tag.as_deref(),
            version,
        ))
    }

    async fn delete_channel(&self, channel: &Channel) -> Result<ChannelDeletion, OrchestratorError> {
        Ok(self.with(|s| {
            let blocking = s.channel_releases.get(&channel.id).cloned().unwrap_or_default();
            if !blocking.is_empty() {
                return ChannelDeletion::refused(blocking);
            }
            s.channels.retain(|c| c.id != channel.id);
            s.deleted_channels.push(channel.id.clone());
            ChannelDeletion::deleted()
        }))
    }

    async fn list_available_packages(
        &self,
        project_id: &str,
        version_range: Option<&str>,
        version_tag: Option<&str>,
        take: usize,
    ) -> Result<Vec<PackageStep>, OrchestratorError> {
        Ok(self.with(|s| {
            s.package_lookups += 1;
            s.packages
                .get(project_id)
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .map(|mut step| {
                    step.available_packages
                        .retain(|p| version_matches(version_range, version_tag, &p.version));
                    step.available_packages.truncate(take);
                    step.selected_package = None;
                    step
                })
                .collect()
        }))
    }

    async fn get_release(&self, release_id: &str) -> Result<Release, OrchestratorError> {
        self.with(|s| s.releases.iter().find(|r| r.id == release_id).cloned())
            .ok_or_else(|| OrchestratorError::NotFound(release_id.to_string()))
    }

    async fn get_release_by_version(
        &self,
        project_id: &str,
        version: &str,
    ) -> Result<Option<Release>, OrchestratorError> {
        Ok(self.with(|s| {
            s.releases
                .iter()
                .find(|r| r.project_id == project_id && r.version == version)
                .cloned()
        }))
    }

    async fn get_latest_release_for_channel(
        &self,
        project_id: &str,
        channel_id: &str,
    ) -> Result<Option<Release>, OrchestratorError> {
        Ok(self.with(|s| {
            s.releases
                .iter()
                .rev()
                .find(|r| r.project_id == project_id && r.channel_id.as_deref() == Some(channel_id))
                .cloned()
        }))
    }

    async fn get_deployed_release(
        &self,
        project_id: &str,
        environment_id: &str,
    ) -> Result<Option<Release>, OrchestratorError> {
        Ok(self.with(|s| {
            s.deployed
                .get(&(project_id.to_string(), environment_id.to_string()))
                .cloned()
        }))
    }

    async fn create_release(
        &self,
        request: &CreateReleaseRequest,
    ) -> Result<Release, OrchestratorError> {
        Ok(self.with(|s| {
            s.release_requests.push(request.clone());
            let release = Release {
                id: format!("Releases-{}", s.releases.len() + 1),
                project_id: request.project_id.clone(),
                channel_id: request.channel_id.clone(),
                version: request.version.clone(),
                selected_packages: request
                    .selected_packages
                    .iter()
                    .map(|p| package(&p.step_id, &p.version))
                    .collect(),
                release_notes: request.release_notes.clone(),
                last_modified_by: None,
                last_modified_on: None,
            };
            s.releases.push(release.clone());
            release
        }))
    }

    async fn rename_release(
        &self,
        release_id: &str,
        version: &str,
    ) -> Result<Release, OrchestratorError> {
        self.with(|s| {
            let release = s.releases.iter_mut().find(|r| r.id == release_id)?;
            release.version = version.to_string();
            Some(release.clone())
        })
        .ok_or_else(|| OrchestratorError::NotFound(release_id.to_string()))
    }

    async fn list_release_deployments(
        &self,
        release_id: &str,
    ) -> Result<Vec<ReleaseDeployment>, OrchestratorError> {
        Ok(self.with(|s| {
            s.history_lookups += 1;
            s.release_deployments.get(release_id).cloned().unwrap_or_default()
        }))
    }

    async fn get_lifecycle(&self, lifecycle_id: &str) -> Result<Lifecycle, OrchestratorError> {
        self.with(|s| s.lifecycles.get(lifecycle_id).cloned())
            .ok_or_else(|| OrchestratorError::NotFound(lifecycle_id.to_string()))
    }

    async fn create_deployment_task(
        &self,
        request: &CreateDeploymentRequest,
    ) -> Result<String, OrchestratorError> {
        self.with(|s| {
            if s.failing_projects.contains(&request.project_id) {
                return Err(OrchestratorError::ApiError {
                    status: 400,
                    body: "deployment rejected".to_string(),
                });
            }
            s.deployment_requests.push(request.clone());
            let id = format!("ServerTasks-{}", s.tasks.len() + 1);
            let task = DeploymentTask {
                id: id.clone(),
                state: s.initial_task_state.unwrap_or(TaskState::Queued),
                percentage_complete: 0,
                estimated_time_remaining: None,
                error_message: None,
                links: BTreeMap::from([(WEB_LINK.to_string(), format!("/app#/tasks/{}", id))]),
            };
            s.tasks.push((request.project_id.clone(), task));
            Ok(id)
        })
    }

    async fn get_task(&self, task_id: &str) -> Result<DeploymentTask, OrchestratorError> {
        self.with(|s| {
            s.tasks
                .iter()
                .find(|(_, t)| t.id == task_id)
                .map(|(_, t)| t.clone())
        })
        .ok_or_else(|| OrchestratorError::NotFound(task_id.to_string()))
    }

    async fn list_recent_tasks(
        &self,
        skip: usize,
        take: usize,
    ) -> Result<Vec<DeploymentTask>, OrchestratorError> {
        let down = self.with(|s| {
            s.task_listings += 1;
            s.task_listing_down
        });
        if down {
            return Err(OrchestratorError::ApiError {
                status: 503,
                body: "Service Unavailable".to_string(),
            });
        }
        Ok(self.with(|s| {
            // Tasks settle into their scripted outcome once listed
            for (project_id, task) in s.tasks.iter_mut() {
                if let Some(state) = s.task_outcomes.get(project_id) {
                    task.state = *state;
                    if *state == TaskState::Failed {
                        task.error_message = Some("Step failed".to_string());
                    }
                }
            }
            s.tasks
                .iter()
                .rev()
                .skip(skip)
                .take(take)
                .map(|(_, t)| t.clone())
                .collect()
        }))
    }

    async fn get_task_raw_log(&self, task_id: &str) -> Result<String, OrchestratorError> {
        Ok(format!("log of {}", task_id))
    }
}

/// Reporter keeping every line for assertions
#[derive(Default)]
pub struct RecordingReporter {
    pub lines: Mutex<Vec<String>>,
    pub progress: Mutex<Vec<(usize, usize)>>,
}

impl RecordingReporter {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn progress(&self) -> Vec<(usize, usize)> {
        self.progress.lock().unwrap().clone()
    }
}

impl Reporter for RecordingReporter {
    fn write_line(&self, message: &str) {
        self.lines.lock().unwrap().push(message.to_string());
    }

    fn write_status_line(&self, message: &str) {
        self.lines.lock().unwrap().push(message.to_string());
    }

    fn write_progress(&self, current: usize, total: usize, _message: &str) {
        self.progress.lock().unwrap().push((current, total));
    }

    fn clean_current_line(&self) {}

    fn stop_animation(&self) {}
}
