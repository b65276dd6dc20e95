//! Error types for the rollout orchestrator

use thiserror::Error;

/// Main error type for the orchestrator
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("API error: {status} - {body}")]
    ApiError { status: u16, body: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Resolution error: {0}")]
    ResolutionError(String),

    #[error("Deployment error: {0}")]
    DeployError(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OrchestratorError {
    /// Errors raised before anything was mutated on the remote side
    pub fn is_upfront(&self) -> bool {
        matches!(
            self,
            OrchestratorError::ConfigError(_) | OrchestratorError::ValidationError(_)
        )
    }
}

impl From<anyhow::Error> for OrchestratorError {
    fn from(err: anyhow::Error) -> Self {
        OrchestratorError::Internal(err.to_string())
    }
}
