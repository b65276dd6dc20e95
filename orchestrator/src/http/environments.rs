//! Environment API client

use tracing::debug;

use crate::errors::OrchestratorError;
use crate::http::client::HttpClient;
use crate::models::environment::Environment;

impl HttpClient {
    /// List every environment
    pub async fn list_environments(&self) -> Result<Vec<Environment>, OrchestratorError> {
        self.get("/environments/all").await
    }

    /// Find an environment by id, falling back to a name match
    pub async fn find_environment(
        &self,
        id_or_name: &str,
    ) -> Result<Option<Environment>, OrchestratorError> {
        let path = format!("/environments/{}", id_or_name);
        if let Ok(Some(environment)) = self.get_optional::<Environment>(&path).await {
            return Ok(Some(environment));
        }

        debug!("No environment with id {}, matching by name", id_or_name);
        let environments = self.list_environments().await?;
        Ok(environments.into_iter().find(|e| e.matches(id_or_name)))
    }
}
