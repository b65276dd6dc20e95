//! Deployment and task API client

use openapi_client::{CreateDeploymentRequest, CreateDeploymentResponse, ResourceCollection};

use crate::errors::OrchestratorError;
use crate::http::client::{query, HttpClient};
use crate::models::task::DeploymentTask;

impl HttpClient {
    /// Create a deployment and return the ID of the task executing it
    pub async fn post_deployment(
        &self,
        request: &CreateDeploymentRequest,
    ) -> Result<String, OrchestratorError> {
        let response: CreateDeploymentResponse = self.post("/deployments", request).await?;
        Ok(response.task_id)
    }

    /// Get task details
    pub async fn fetch_task(&self, task_id: &str) -> Result<DeploymentTask, OrchestratorError> {
        let path = format!("/tasks/{}", task_id);
        self.get(&path).await
    }

    /// List the most recent tasks, newest first
    pub async fn list_tasks(
        &self,
        skip: usize,
        take: usize,
    ) -> Result<Vec<DeploymentTask>, OrchestratorError> {
        let skip = skip.to_string();
        let take = take.to_string();
        let path = format!(
            "/tasks{}",
            query(&[("skip", Some(skip.as_str())), ("take", Some(take.as_str()))])
        );
        let response: ResourceCollection<DeploymentTask> = self.get(&path).await?;
        Ok(response.into_items())
    }

    /// Raw execution log of a task
    pub async fn fetch_task_log(&self, task_id: &str) -> Result<String, OrchestratorError> {
        let path = format!("/tasks/{}/raw", task_id);
        self.get_text(&path).await
    }
}
