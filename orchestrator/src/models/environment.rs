//! Environment models

use serde::{Deserialize, Serialize};

/// A deployment target environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// Unique environment ID
    pub id: String,

    /// Display name
    pub name: String,
}

impl Environment {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Match either the id or (case-insensitively) the name
    pub fn matches(&self, id_or_name: &str) -> bool {
        self.id == id_or_name || self.name.eq_ignore_ascii_case(id_or_name)
    }
}
