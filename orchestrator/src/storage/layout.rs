//! Storage layout configuration

use std::path::PathBuf;

use crate::filesys::file::File;

/// On-disk layout of settings, profiles and logs
#[derive(Debug, Clone)]
pub struct StorageLayout {
    pub base_dir: PathBuf,
}

impl StorageLayout {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn settings_file(&self) -> File {
        File::new(self.base_dir.join("settings.json"))
    }

    pub fn profiles_dir(&self) -> PathBuf {
        self.base_dir.join("profiles")
    }

    /// Profile file for `name`; a name with an extension is used as is
    pub fn profile_file(&self, name: &str) -> File {
        let file_name = if name.ends_with(".json") {
            name.to_string()
        } else {
            format!("{}.json", name)
        };
        File::new(self.profiles_dir().join(file_name))
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        let base_dir = std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".rollout");

        Self::new(base_dir)
    }
}
