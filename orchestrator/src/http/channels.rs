//! Channel API client

use openapi_client::{ResourceCollection, VersionValidationRequest, VersionValidationResponse};
use tracing::{debug, info};

use crate::errors::OrchestratorError;
use crate::http::client::HttpClient;
use crate::models::channel::{Channel, ChannelDeletion};
use crate::models::release::Release;

impl HttpClient {
    /// List the channels of a project
    pub async fn list_channels(&self, project_id: &str) -> Result<Vec<Channel>, OrchestratorError> {
        let path = format!("/projects/{}/channels", project_id);
        let response: ResourceCollection<Channel> = self.get(&path).await?;
        Ok(response.into_items())
    }

    /// Find a project channel by name (case-insensitive)
    pub async fn find_channel_by_name(
        &self,
        project_id: &str,
        name: &str,
    ) -> Result<Option<Channel>, OrchestratorError> {
        let channels = self.list_channels(project_id).await?;
        Ok(channels
            .into_iter()
            .find(|c| c.name.eq_ignore_ascii_case(name)))
    }

    /// Check whether a version satisfies the channel's range and tag
    pub async fn check_channel_version(
        &self,
        channel: &Channel,
        version: &str,
    ) -> Result<bool, OrchestratorError> {
        let request = VersionValidationRequest {
            version: version.to_string(),
            version_range: channel.version_range.clone(),
            pre_release_tag: channel.version_tag.clone(),
        };
        let response: VersionValidationResponse =
            self.post("/channels/rule-test", &request).await?;
        Ok(response.is_valid())
    }

    /// List the releases built against a channel
    pub async fn list_channel_releases(
        &self,
        channel_id: &str,
    ) -> Result<Vec<Release>, OrchestratorError> {
        let path = format!("/channels/{}/releases", channel_id);
        let response: ResourceCollection<Release> = self.get(&path).await?;
        Ok(response.into_items())
    }

    /// Delete a channel unless releases still reference it
    pub async fn remove_channel(&self, channel: &Channel) -> Result<ChannelDeletion, OrchestratorError> {
        let releases = self.list_channel_releases(&channel.id).await?;
        if !releases.is_empty() {
            debug!(
                "Channel {} still has {} releases, refusing delete",
                channel.name,
                releases.len()
            );
            return Ok(ChannelDeletion::refused(
                releases.into_iter().map(|r| r.version).collect(),
            ));
        }

        let path = format!("/channels/{}", channel.id);
        self.delete(&path).await?;
        info!("Deleted channel {} ({})", channel.name, channel.id);
        Ok(ChannelDeletion::deleted())
    }
}
