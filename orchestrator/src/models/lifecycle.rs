//! Lifecycle models

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// An ordered promotion policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifecycle {
    /// Unique lifecycle ID
    pub id: String,

    /// Lifecycle name
    pub name: String,

    /// Phases in promotion order; the first one is the entry phase
    #[serde(default)]
    pub phases: Vec<Phase>,
}

impl Lifecycle {
    pub fn entry_phase(&self) -> Option<&Phase> {
        self.phases.first()
    }
}

/// A single lifecycle phase
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub id: String,

    pub name: String,

    /// Environments deployed to automatically when the phase is reached
    #[serde(default)]
    pub automatic_target_environment_ids: BTreeSet<String>,

    /// Environments that may be deployed to manually
    #[serde(default)]
    pub optional_target_environment_ids: BTreeSet<String>,

    /// How many of the phase's environments must be deployed before promotion
    #[serde(default)]
    pub minimum_environments_before_promotion: u32,

    /// Optional phases never gate promotion
    #[serde(default)]
    pub is_optional_phase: bool,
}

impl Phase {
    pub fn targets(&self, environment_id: &str) -> bool {
        self.optional_target_environment_ids.contains(environment_id)
            || self.automatic_target_environment_ids.contains(environment_id)
    }
}
