//! Lifecycle API client

use crate::errors::OrchestratorError;
use crate::http::client::HttpClient;
use crate::models::lifecycle::Lifecycle;

impl HttpClient {
    /// Get a lifecycle by ID
    pub async fn fetch_lifecycle(&self, lifecycle_id: &str) -> Result<Lifecycle, OrchestratorError> {
        let path = format!("/lifecycles/{}", lifecycle_id);
        self.get(&path).await
    }
}
