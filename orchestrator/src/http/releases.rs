//! Release API client

use openapi_client::{CreateReleaseRequest, RenameReleaseRequest, ResourceCollection};

use crate::errors::OrchestratorError;
use crate::http::client::{query, HttpClient};
use crate::models::release::{Release, ReleaseDeployment};

impl HttpClient {
    /// Get a release by ID
    pub async fn fetch_release(&self, release_id: &str) -> Result<Release, OrchestratorError> {
        let path = format!("/releases/{}", release_id);
        self.get(&path).await
    }

    /// Find a project release by its version string
    pub async fn find_release_by_version(
        &self,
        project_id: &str,
        version: &str,
    ) -> Result<Option<Release>, OrchestratorError> {
        let path = format!(
            "/projects/{}/releases{}",
            project_id,
            query(&[("version", Some(version)), ("take", Some("1"))])
        );
        let response: ResourceCollection<Release> = self.get(&path).await?;
        Ok(response.into_items().into_iter().find(|r| r.version == version))
    }

    /// Most recent release built against a channel
    pub async fn find_latest_channel_release(
        &self,
        project_id: &str,
        channel_id: &str,
    ) -> Result<Option<Release>, OrchestratorError> {
        let path = format!(
            "/projects/{}/channels/{}/releases{}",
            project_id,
            channel_id,
            query(&[("take", Some("1"))])
        );
        let response: ResourceCollection<Release> = self.get(&path).await?;
        Ok(response.into_items().into_iter().next())
    }

    /// Release currently live for a project in an environment
    pub async fn find_deployed_release(
        &self,
        project_id: &str,
        environment_id: &str,
    ) -> Result<Option<Release>, OrchestratorError> {
        let path = format!(
            "/projects/{}/releases/deployed{}",
            project_id,
            query(&[("environment", Some(environment_id))])
        );
        self.get_optional(&path).await
    }

    /// Create a release
    pub async fn post_release(
        &self,
        request: &CreateReleaseRequest,
    ) -> Result<Release, OrchestratorError> {
        self.post("/releases", request).await
    }

    /// Change a release's version string
    pub async fn put_release_version(
        &self,
        release_id: &str,
        version: &str,
    ) -> Result<Release, OrchestratorError> {
        let path = format!("/releases/{}/version", release_id);
        let request = RenameReleaseRequest {
            version: version.to_string(),
        };
        self.put(&path, &request).await
    }

    /// Deployment history of a release
    pub async fn list_release_deployments(
        &self,
        release_id: &str,
    ) -> Result<Vec<ReleaseDeployment>, OrchestratorError> {
        let path = format!("/releases/{}/deployments", release_id);
        let response: ResourceCollection<ReleaseDeployment> = self.get(&path).await?;
        Ok(response.into_items())
    }
}
