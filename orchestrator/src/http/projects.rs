//! Project API client

use crate::errors::OrchestratorError;
use crate::http::client::HttpClient;
use crate::models::project::{ProjectGroup, ProjectStub};

impl HttpClient {
    /// List every project
    pub async fn list_projects(&self) -> Result<Vec<ProjectStub>, OrchestratorError> {
        self.get("/projects/all").await
    }

    /// Get a project by ID
    pub async fn find_project(
        &self,
        project_id: &str,
    ) -> Result<Option<ProjectStub>, OrchestratorError> {
        let path = format!("/projects/{}", project_id);
        self.get_optional(&path).await
    }

    /// List every project group
    pub async fn list_project_groups(&self) -> Result<Vec<ProjectGroup>, OrchestratorError> {
        self.get("/projectgroups/all").await
    }
}
