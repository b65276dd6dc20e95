//! File operations

use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::errors::OrchestratorError;

/// A file on disk addressed by path
#[derive(Debug, Clone)]
pub struct File {
    path: PathBuf,
}

impl File {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path).await.is_ok()
    }

    pub async fn read_string(&self) -> Result<String, OrchestratorError> {
        Ok(fs::read_to_string(&self.path).await?)
    }

    /// Read and parse JSON, naming the file when it is missing
    pub async fn read_json<T: DeserializeOwned>(&self) -> Result<T, OrchestratorError> {
        if !self.exists().await {
            return Err(OrchestratorError::NotFound(format!(
                "file {} does not exist",
                self.path.display()
            )));
        }
        let contents = self.read_string().await?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Write JSON through a temporary sibling so readers never see half a file
    pub async fn write_json<T: Serialize>(&self, value: &T) -> Result<(), OrchestratorError> {
        let contents = serde_json::to_string_pretty(value)?;
        self.write_atomic(contents.as_bytes()).await
    }

    pub async fn write_atomic(&self, contents: &[u8]) -> Result<(), OrchestratorError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let temp_path = self.path.with_extension("tmp");

        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }

    pub async fn delete(&self) -> Result<(), OrchestratorError> {
        if self.exists().await {
            fs::remove_file(&self.path).await?;
        }
        Ok(())
    }
}
