//! Remote deployment service contract

use async_trait::async_trait;
use openapi_client::{CreateDeploymentRequest, CreateReleaseRequest};

use crate::errors::OrchestratorError;
use crate::http::client::HttpClient;
use crate::models::channel::{Channel, ChannelDeletion};
use crate::models::environment::Environment;
use crate::models::lifecycle::Lifecycle;
use crate::models::project::{PackageStep, ProjectGroup, ProjectStub};
use crate::models::release::{Release, ReleaseDeployment};
use crate::models::task::DeploymentTask;

/// Operations the orchestrator needs from the release platform.
///
/// `HttpClient` is the production implementation; components take an
/// `Arc<dyn DeploymentService>` so they can run against a cache decorator or
/// an in-memory fake.
#[async_trait]
pub trait DeploymentService: Send + Sync {
    /// Base URL that relative task links resolve against
    fn base_url(&self) -> &str;

    async fn list_environments(&self) -> Result<Vec<Environment>, OrchestratorError>;

    async fn get_environment(
        &self,
        id_or_name: &str,
    ) -> Result<Option<Environment>, OrchestratorError>;

    async fn list_projects(&self) -> Result<Vec<ProjectStub>, OrchestratorError>;

    async fn get_project(&self, project_id: &str) -> Result<Option<ProjectStub>, OrchestratorError>;

    async fn list_project_groups(&self) -> Result<Vec<ProjectGroup>, OrchestratorError>;

    async fn get_channel_by_name(
        &self,
        project_id: &str,
        name: &str,
    ) -> Result<Option<Channel>, OrchestratorError>;

    async fn list_channels(&self, project_id: &str) -> Result<Vec<Channel>, OrchestratorError>;

    /// Whether `version` passes the channel's range and tag filter
    async fn validate_version(
        &self,
        channel: &Channel,
        version: &str,
    ) -> Result<bool, OrchestratorError>;

    /// Delete a channel; refused while releases reference it
    async fn delete_channel(&self, channel: &Channel) -> Result<ChannelDeletion, OrchestratorError>;

    /// Available packages per step, each list ordered best match first
    async fn list_available_packages(
        &self,
        project_id: &str,
        version_range: Option<&str>,
        version_tag: Option<&str>,
        take: usize,
    ) -> Result<Vec<PackageStep>, OrchestratorError>;

    async fn get_release(&self, release_id: &str) -> Result<Release, OrchestratorError>;

    async fn get_release_by_version(
        &self,
        project_id: &str,
        version: &str,
    ) -> Result<Option<Release>, OrchestratorError>;

    async fn get_latest_release_for_channel(
        &self,
        project_id: &str,
        channel_id: &str,
    ) -> Result<Option<Release>, OrchestratorError>;

    /// Release currently live for the project in the environment
    async fn get_deployed_release(
        &self,
        project_id: &str,
        environment_id: &str,
    ) -> Result<Option<Release>, OrchestratorError>;

    async fn create_release(
        &self,
        request: &CreateReleaseRequest,
    ) -> Result<Release, OrchestratorError>;

    async fn rename_release(
        &self,
        release_id: &str,
        version: &str,
    ) -> Result<Release, OrchestratorError>;

    async fn list_release_deployments(
        &self,
        release_id: &str,
    ) -> Result<Vec<ReleaseDeployment>, OrchestratorError>;

    async fn get_lifecycle(&self, lifecycle_id: &str) -> Result<Lifecycle, OrchestratorError>;

    /// Queue a deployment and return its task ID
    async fn create_deployment_task(
        &self,
        request: &CreateDeploymentRequest,
    ) -> Result<String, OrchestratorError>;

    async fn get_task(&self, task_id: &str) -> Result<DeploymentTask, OrchestratorError>;

    /// Most recent tasks, newest first
    async fn list_recent_tasks(
        &self,
        skip: usize,
        take: usize,
    ) -> Result<Vec<DeploymentTask>, OrchestratorError>;

    async fn get_task_raw_log(&self, task_id: &str) -> Result<String, OrchestratorError>;
}

#[async_trait]
impl DeploymentService for HttpClient {
    fn base_url(&self) -> &str {
        HttpClient::base_url(self)
    }

    async fn list_environments(&self) -> Result<Vec<Environment>, OrchestratorError> {
        HttpClient::list_environments(self).await
    }

    async fn get_environment(
        &self,
        id_or_name: &str,
    ) -> Result<Option<Environment>, OrchestratorError> {
        self.find_environment(id_or_name).await
    }

    async fn list_projects(&self) -> Result<Vec<ProjectStub>, OrchestratorError> {
        HttpClient::list_projects(self).await
    }

    async fn get_project(&self, project_id: &str) -> Result<Option<ProjectStub>, OrchestratorError> {
        self.find_project(project_id).await
    }

    async fn list_project_groups(&self) -> Result<Vec<ProjectGroup>, OrchestratorError> {
        HttpClient::list_project_groups(self).await
    }

    async fn get_channel_by_name(
        &self,
        project_id: &str,
        name: &str,
    ) -> Result<Option<Channel>, OrchestratorError> {
        self.find_channel_by_name(project_id, name).await
    }

    async fn list_channels(&self, project_id: &str) -> Result<Vec<Channel>, OrchestratorError> {
        HttpClient::list_channels(self, project_id).await
    }

    async fn validate_version(
        &self,
        channel: &Channel,
        version: &str,
    ) -> Result<bool, OrchestratorError> {
        self.check_channel_version(channel, version).await
    }

    async fn delete_channel(&self, channel: &Channel) -> Result<ChannelDeletion, OrchestratorError> {
        self.remove_channel(channel).await
    }

    async fn list_available_packages(
        &self,
        project_id: &str,
        version_range: Option<&str>,
        version_tag: Option<&str>,
        take: usize,
    ) -> Result<Vec<PackageStep>, OrchestratorError> {
        self.list_packages(project_id, version_range, version_tag, take)
            .await
    }

    async fn get_release(&self, release_id: &str) -> Result<Release, OrchestratorError> {
        self.fetch_release(release_id).await
    }

    async fn get_release_by_version(
        &self,
        project_id: &str,
        version: &str,
    ) -> Result<Option<Release>, OrchestratorError> {
        self.find_release_by_version(project_id, version).await
    }

    async fn get_latest_release_for_channel(
        &self,
        project_id: &str,
        channel_id: &str,
    ) -> Result<Option<Release>, OrchestratorError> {
        self.find_latest_channel_release(project_id, channel_id).await
    }

    async fn get_deployed_release(
        &self,
        project_id: &str,
        environment_id: &str,
    ) -> Result<Option<Release>, OrchestratorError> {
        self.find_deployed_release(project_id, environment_id).await
    }

    async fn create_release(
        &self,
        request: &CreateReleaseRequest,
    ) -> Result<Release, OrchestratorError> {
        self.post_release(request).await
    }

    async fn rename_release(
        &self,
        release_id: &str,
        version: &str,
    ) -> Result<Release, OrchestratorError> {
        self.put_release_version(release_id, version).await
    }

    async fn list_release_deployments(
        &self,
        release_id: &str,
    ) -> Result<Vec<ReleaseDeployment>, OrchestratorError> {
        HttpClient::list_release_deployments(self, release_id).await
    }

    async fn get_lifecycle(&self, lifecycle_id: &str) -> Result<Lifecycle, OrchestratorError> {
        self.fetch_lifecycle(lifecycle_id).await
    }

    async fn create_deployment_task(
        &self,
        request: &CreateDeploymentRequest,
    ) -> Result<String, OrchestratorError> {
        self.post_deployment(request).await
    }

    async fn get_task(&self, task_id: &str) -> Result<DeploymentTask, OrchestratorError> {
        self.fetch_task(task_id).await
    }

    async fn list_recent_tasks(
        &self,
        skip: usize,
        take: usize,
    ) -> Result<Vec<DeploymentTask>, OrchestratorError> {
        self.list_tasks(skip, take).await
    }

    async fn get_task_raw_log(&self, task_id: &str) -> Result<String, OrchestratorError> {
        self.fetch_task_log(task_id).await
    }
}
