//! Package API client

use crate::errors::OrchestratorError;
use crate::http::client::{query, HttpClient};
use crate::models::project::PackageStep;

impl HttpClient {
    /// List packages per deployment step, best match first
    pub async fn list_packages(
        &self,
        project_id: &str,
        version_range: Option<&str>,
        version_tag: Option<&str>,
        take: usize,
    ) -> Result<Vec<PackageStep>, OrchestratorError> {
        let take = take.to_string();
        let path = format!(
            "/projects/{}/packages{}",
            project_id,
            query(&[
                ("versionRange", version_range.filter(|r| !r.is_empty())),
                ("preReleaseTag", version_tag.filter(|t| !t.is_empty())),
                ("take", Some(take.as_str())),
            ])
        );
        self.get(&path).await
    }
}
