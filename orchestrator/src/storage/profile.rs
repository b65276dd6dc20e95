//! Replayable deployment profiles
//!
//! A profile is a saved job whose package references are replaced by the
//! `latest` sentinel, so replaying it resolves packages again instead of
//! redeploying the exact versions of the original run.

use tracing::info;

use crate::errors::OrchestratorError;
use crate::filesys::file::File;
use crate::models::deployment::EnvironmentDeployment;

/// Persist `job` as a profile
pub async fn save_profile(file: &File, job: &EnvironmentDeployment) -> Result<(), OrchestratorError> {
    file.write_json(&job.to_profile()).await?;
    info!(
        "Saved profile for {} projects to {}",
        job.project_deployments.len(),
        file.path().display()
    );
    Ok(())
}

/// Load a profile saved by [`save_profile`]
pub async fn load_profile(file: &File) -> Result<EnvironmentDeployment, OrchestratorError> {
    let job: EnvironmentDeployment = file.read_json().await?;
    if job.environment_id.is_empty() && job.environment_name.is_empty() {
        return Err(OrchestratorError::ValidationError(format!(
            "profile {} names no environment",
            file.path().display()
        )));
    }
    Ok(job)
}
