//! HTTP client implementation

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};
use url::Url;

use crate::errors::OrchestratorError;

/// Header carrying the platform API key
pub const API_KEY_HEADER: &str = "X-Api-Key";

/// HTTP client for the release platform REST API
pub struct HttpClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(base_url: &str, api_key: SecretString) -> Result<Self, OrchestratorError> {
        Self::with_timeout(base_url, api_key, Duration::from_secs(30))
    }

    /// Create a new HTTP client with a custom request timeout
    pub fn with_timeout(
        base_url: &str,
        api_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, OrchestratorError> {
        // Reject malformed URLs before any request goes out
        Url::parse(base_url)?;

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(API_KEY_HEADER, self.api_key.expose_secret())
    }

    async fn check(method: &str, url: &str, response: Response) -> Result<Response, OrchestratorError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        error!("HTTP {} {} failed: {} - {}", method, url, status, body);
        Err(OrchestratorError::ApiError {
            status: status.as_u16(),
            body,
        })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, OrchestratorError> {
        let url = self.url(path);
        debug!("GET {}", url);

        let response = self.authorize(self.client.get(&url)).send().await?;
        let response = Self::check("GET", &url, response).await?;
        Ok(response.json().await?)
    }

    /// Make a GET request, mapping 404 to `None`
    pub async fn get_optional<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Option<T>, OrchestratorError> {
        let url = self.url(path);
        debug!("GET {}", url);

        let response = self.authorize(self.client.get(&url)).send().await?;
        if response.status() == http::StatusCode::NOT_FOUND {
            debug!("GET {} returned 404", url);
            return Ok(None);
        }
        let response = Self::check("GET", &url, response).await?;
        Ok(Some(response.json().await?))
    }

    /// Make a GET request returning the raw body
    pub async fn get_text(&self, path: &str) -> Result<String, OrchestratorError> {
        let url = self.url(path);
        debug!("GET {} (text)", url);

        let response = self.authorize(self.client.get(&url)).send().await?;
        let response = Self::check("GET", &url, response).await?;
        Ok(response.text().await?)
    }

    /// Make a POST request
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, OrchestratorError> {
        let url = self.url(path);
        debug!("POST {}", url);

        let response = self
            .authorize(self.client.post(&url))
            .json(body)
            .send()
            .await?;
        let response = Self::check("POST", &url, response).await?;
        Ok(response.json().await?)
    }

    /// Make a PUT request
    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, OrchestratorError> {
        let url = self.url(path);
        debug!("PUT {}", url);

        let response = self
            .authorize(self.client.put(&url))
            .json(body)
            .send()
            .await?;
        let response = Self::check("PUT", &url, response).await?;
        Ok(response.json().await?)
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str) -> Result<(), OrchestratorError> {
        let url = self.url(path);
        debug!("DELETE {}", url);

        let response = self.authorize(self.client.delete(&url)).send().await?;
        Self::check("DELETE", &url, response).await?;
        Ok(())
    }
}

/// Build a query string from optional pairs, skipping `None` values
pub(crate) fn query(pairs: &[(&str, Option<&str>)]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        if let Some(value) = value {
            serializer.append_pair(key, value);
        }
    }
    let encoded = serializer.finish();
    if encoded.is_empty() {
        encoded
    } else {
        format!("?{}", encoded)
    }
}
