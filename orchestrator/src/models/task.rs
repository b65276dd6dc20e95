//! Deployment task models

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Link relation pointing at the platform's web UI
pub const WEB_LINK: &str = "Web";

/// Remote task state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskState {
    Queued,

    #[serde(alias = "Executing", alias = "Cancelling")]
    InProgress,

    #[serde(alias = "Success")]
    Done,

    #[serde(alias = "Canceled", alias = "TimedOut")]
    Failed,
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskState::Queued => "queued",
            TaskState::InProgress => "in progress",
            TaskState::Done => "done",
            TaskState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A remote, asynchronously executing deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentTask {
    /// Unique task ID
    pub id: String,

    /// Current state
    pub state: TaskState,

    #[serde(default)]
    pub percentage_complete: u8,

    #[serde(default)]
    pub estimated_time_remaining: Option<String>,

    #[serde(default)]
    pub error_message: Option<String>,

    /// Relation name to URL, relative to the server base URL
    #[serde(default)]
    pub links: BTreeMap<String, String>,
}

impl DeploymentTask {
    pub fn web_link(&self) -> Option<&str> {
        self.links.get(WEB_LINK).map(String::as_str)
    }
}
