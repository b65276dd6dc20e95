//! Caching decorator for the deployment service

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use openapi_client::{CreateDeploymentRequest, CreateReleaseRequest};
use tracing::debug;

use crate::cache::ttl::TtlCache;
use crate::errors::OrchestratorError;
use crate::http::service::DeploymentService;
use crate::models::channel::{Channel, ChannelDeletion};
use crate::models::environment::Environment;
use crate::models::lifecycle::Lifecycle;
use crate::models::project::{PackageStep, ProjectGroup, ProjectStub};
use crate::models::release::{Release, ReleaseDeployment};
use crate::models::task::DeploymentTask;

const ALL: &str = "all";

/// Wraps a `DeploymentService` and memoizes reference-data lookups.
///
/// Environments, lifecycles, projects, project groups and channels are
/// cached; releases, packages and tasks always go to the inner service.
pub struct CachedService {
    inner: Arc<dyn DeploymentService>,
    environments: TtlCache<Vec<Environment>>,
    environment: TtlCache<Option<Environment>>,
    lifecycles: TtlCache<Lifecycle>,
    projects: TtlCache<Vec<ProjectStub>>,
    project_groups: TtlCache<Vec<ProjectGroup>>,
    channels: TtlCache<Vec<Channel>>,
    channel_by_name: TtlCache<Option<Channel>>,
}

impl CachedService {
    pub fn new(inner: Arc<dyn DeploymentService>, ttl: Duration) -> Self {
        Self {
            inner,
            environments: TtlCache::new(ttl),
            environment: TtlCache::new(ttl),
            lifecycles: TtlCache::new(ttl),
            projects: TtlCache::new(ttl),
            project_groups: TtlCache::new(ttl),
            channels: TtlCache::new(ttl),
            channel_by_name: TtlCache::new(ttl),
        }
    }

    fn channel_key(project_id: &str, name: &str) -> String {
        format!("{}:{}", project_id, name.to_lowercase())
    }
}

#[async_trait]
impl DeploymentService for CachedService {
    fn base_url(&self) -> &str {
        self.inner.base_url()
    }

    async fn list_environments(&self) -> Result<Vec<Environment>, OrchestratorError> {
        if let Some(hit) = self.environments.get(ALL) {
            return Ok(hit);
        }
        let environments = self.inner.list_environments().await?;
        self.environments.set(ALL, environments.clone());
        Ok(environments)
    }

    async fn get_environment(
        &self,
        id_or_name: &str,
    ) -> Result<Option<Environment>, OrchestratorError> {
        if let Some(hit) = self.environment.get(id_or_name) {
            debug!("Environment cache hit: {}", id_or_name);
            return Ok(hit);
        }
        let environment = self.inner.get_environment(id_or_name).await?;
        self.environment.set(id_or_name, environment.clone());
        Ok(environment)
    }

    async fn list_projects(&self) -> Result<Vec<ProjectStub>, OrchestratorError> {
        if let Some(hit) = self.projects.get(ALL) {
            return Ok(hit);
        }
        let projects = self.inner.list_projects().await?;
        self.projects.set(ALL, projects.clone());
        Ok(projects)
    }

    async fn get_project(&self, project_id: &str) -> Result<Option<ProjectStub>, OrchestratorError> {
        if let Some(projects) = self.projects.get(ALL) {
            if let Some(project) = projects.into_iter().find(|p| p.id == project_id) {
                return Ok(Some(project));
            }
        }
        self.inner.get_project(project_id).await
    }

    async fn list_project_groups(&self) -> Result<Vec<ProjectGroup>, OrchestratorError> {
        if let Some(hit) = self.project_groups.get(ALL) {
            return Ok(hit);
        }
        let groups = self.inner.list_project_groups().await?;
        self.project_groups.set(ALL, groups.clone());
        Ok(groups)
    }

    async fn get_channel_by_name(
        &self,
        project_id: &str,
        name: &str,
    ) -> Result<Option<Channel>, OrchestratorError> {
        let key = Self::channel_key(project_id, name);
        if let Some(hit) = self.channel_by_name.get(&key) {
            debug!("Channel cache hit: {}", key);
            return Ok(hit);
        }
        let channel = self.inner.get_channel_by_name(project_id, name).await?;
        self.channel_by_name.set(key, channel.clone());
        Ok(channel)
    }

    async fn list_channels(&self, project_id: &str) -> Result<Vec<Channel>, OrchestratorError> {
        if let Some(hit) = self.channels.get(project_id) {
            return Ok(hit);
        }
        let channels = self.inner.list_channels(project_id).await?;
        self.channels.set(project_id, channels.clone());
        Ok(channels)
    }

    async fn validate_version(
        &self,
        channel: &Channel,
        version: &str,
    ) -> Result<bool, OrchestratorError> {
        self.inner.validate_version(channel, version).await
    }

    async fn delete_channel(&self, channel: &Channel) -> Result<ChannelDeletion, OrchestratorError> {
        let deletion = self.inner.delete_channel(channel).await?;
        if deletion.success {
            self.channels.remove(&channel.project_id);
            self.channel_by_name
                .remove(&Self::channel_key(&channel.project_id, &channel.name));
        }
        Ok(deletion)
    }

    async fn list_available_packages(
        &self,
        project_id: &str,
        version_range: Option<&str>,
        version_tag: Option<&str>,
        take: usize,
    ) -> Result<Vec<PackageStep>, OrchestratorError> {
        self.inner
            .list_available_packages(project_id, version_range, version_tag, take)
            .await
    }

    async fn get_release(&self, release_id: &str) -> Result<Release, OrchestratorError> {
        self.inner.get_release(release_id).await
    }

    async fn get_release_by_version(
        &self,
        project_id: &str,
        version: &str,
    ) -> Result<Option<Release>, OrchestratorError> {
        self.inner.get_release_by_version(project_id, version).await
    }

    async fn get_latest_release_for_channel(
        &self,
        project_id: &str,
        channel_id: &str,
    ) -> Result<Option<Release>, OrchestratorError> {
        self.inner
            .get_latest_release_for_channel(project_id, channel_id)
            .await
    }

    async fn get_deployed_release(
        &self,
        project_id: &str,
        environment_id: &str,
    ) -> Result<Option<Release>, OrchestratorError> {
        self.inner
            .get_deployed_release(project_id, environment_id)
            .await
    }

    async fn create_release(
        &self,
        request: &CreateReleaseRequest,
    ) -> Result<Release, OrchestratorError> {
        self.inner.create_release(request).await
    }

    async fn rename_release(
        &self,
        release_id: &str,
        version: &str,
    ) -> Result<Release, OrchestratorError> {
        self.inner.rename_release(release_id, version).await
    }

    async fn list_release_deployments(
        &self,
        release_id: &str,
    ) -> Result<Vec<ReleaseDeployment>, OrchestratorError> {
        self.inner.list_release_deployments(release_id).await
    }

    async fn get_lifecycle(&self, lifecycle_id: &str) -> Result<Lifecycle, OrchestratorError> {
        if let Some(hit) = self.lifecycles.get(lifecycle_id) {
            debug!("Lifecycle cache hit: {}", lifecycle_id);
            return Ok(hit);
        }
        let lifecycle = self.inner.get_lifecycle(lifecycle_id).await?;
        self.lifecycles.set(lifecycle_id, lifecycle.clone());
        Ok(lifecycle)
    }

    async fn create_deployment_task(
        &self,
        request: &CreateDeploymentRequest,
    ) -> Result<String, OrchestratorError> {
        self.inner.create_deployment_task(request).await
    }

    async fn get_task(&self, task_id: &str) -> Result<DeploymentTask, OrchestratorError> {
        self.inner.get_task(task_id).await
    }

    async fn list_recent_tasks(
        &self,
        skip: usize,
        take: usize,
    ) -> Result<Vec<DeploymentTask>, OrchestratorError> {
        self.inner.list_recent_tasks(skip, take).await
    }

    async fn get_task_raw_log(&self, task_id: &str) -> Result<String, OrchestratorError> {
        self.inner.get_task_raw_log(task_id).await
    }
}
