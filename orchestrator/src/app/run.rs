//! Command execution

use tracing::{error, info};

use crate::app::options::AppOptions;
use crate::app::state::AppState;
use crate::deploy::cancel::Cancellation;
use crate::errors::OrchestratorError;
use crate::models::deployment::EnvironmentDeployment;
use crate::models::environment::Environment;
use crate::storage::profile::{load_profile, save_profile};

/// A command selected on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Resolve the projects needing deployment and save them as a profile
    Plan {
        environment: String,
        channel: Option<String>,
        profile: String,
    },

    /// Check a saved profile against the project lifecycles
    Validate { profile: String },

    /// Validate, resolve and run a job from a profile or built on the fly
    Deploy(DeployArgs),

    /// Delete channels no available package matches
    CleanupChannels {
        group: Option<String>,
        test_mode: bool,
    },
}

/// Arguments of the deploy command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployArgs {
    /// Replay this profile instead of planning
    pub profile: Option<String>,

    /// Target environment; overrides the profile's
    pub environment: Option<String>,

    pub channel: Option<String>,

    pub deploy_async: bool,

    pub fallback: bool,

    pub prioritise: bool,
}

/// How a command ended, when it did not fail outright
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,

    /// The lifecycle check refused the job
    Unsafe,

    /// A channel deletion was refused or errored
    CleanupIncomplete,
}

impl RunStatus {
    pub fn exit_code(self) -> u8 {
        match self {
            RunStatus::Completed => 0,
            RunStatus::Unsafe => 3,
            RunStatus::CleanupIncomplete => 4,
        }
    }
}

/// Exit code for a command that returned an error
pub fn error_exit_code(err: &OrchestratorError) -> u8 {
    if err.is_upfront() {
        2
    } else {
        1
    }
}

/// Run a command against the configured platform
pub async fn run(
    command: Command,
    options: &AppOptions,
    state: &AppState,
    cancel: &Cancellation,
) -> Result<RunStatus, OrchestratorError> {
    info!("Running {:?}", command);
    match command {
        Command::Plan {
            environment,
            channel,
            profile,
        } => plan(options, state, &environment, channel.as_deref(), &profile, cancel).await,
        Command::Validate { profile } => validate(options, state, &profile).await,
        Command::Deploy(args) => deploy(options, state, args, cancel).await,
        Command::CleanupChannels { group, test_mode } => {
            let report = state.cleaner.cleanup(group.as_deref(), test_mode).await?;
            if report.all_succeeded() {
                Ok(RunStatus::Completed)
            } else {
                Ok(RunStatus::CleanupIncomplete)
            }
        }
    }
}

async fn find_environment(state: &AppState, id_or_name: &str) -> Result<Environment, OrchestratorError> {
    state
        .service
        .get_environment(id_or_name)
        .await?
        .ok_or_else(|| {
            OrchestratorError::ValidationError(format!("environment {} does not exist", id_or_name))
        })
}

/// Resolve every project for the environment and keep those needing deployment
async fn build_job(
    state: &AppState,
    environment: &Environment,
    channel: Option<&str>,
    cancel: &Cancellation,
) -> Result<EnvironmentDeployment, OrchestratorError> {
    let stubs = state.service.list_projects().await?;
    let projects = state
        .resolver
        .resolve_projects(stubs, environment, channel, cancel)
        .await?;
    let job = EnvironmentDeployment::from_projects(environment, channel.unwrap_or_default(), &projects);
    state.reporter.write_status_line(&format!(
        "{} of {} projects need deploying to {}",
        job.project_deployments.len(),
        projects.len(),
        environment.name
    ));
    Ok(job)
}

async fn plan(
    options: &AppOptions,
    state: &AppState,
    environment: &str,
    channel: Option<&str>,
    profile: &str,
    cancel: &Cancellation,
) -> Result<RunStatus, OrchestratorError> {
    let environment = find_environment(state, environment).await?;
    let job = build_job(state, &environment, channel, cancel).await?;

    let file = options.layout.profile_file(profile);
    save_profile(&file, &job).await?;
    state
        .reporter
        .write_line(&format!("Saved profile {}", file.path().display()));
    Ok(RunStatus::Completed)
}

async fn validate(
    options: &AppOptions,
    state: &AppState,
    profile: &str,
) -> Result<RunStatus, OrchestratorError> {
    let mut job = load_profile(&options.layout.profile_file(profile)).await?;
    fill_environment(state, &mut job, None).await?;
    check(state, &job).await
}

async fn check(state: &AppState, job: &EnvironmentDeployment) -> Result<RunStatus, OrchestratorError> {
    let result = state.validator.check_deployment(job).await?;
    if result.success {
        state.reporter.write_line("Lifecycle check passed");
        Ok(RunStatus::Completed)
    } else {
        let message = result.error_message.unwrap_or_default();
        error!("{}", message);
        state.reporter.write_line(&message);
        Ok(RunStatus::Unsafe)
    }
}

/// Point the job at `override_env`, or complete the environment it names
async fn fill_environment(
    state: &AppState,
    job: &mut EnvironmentDeployment,
    override_env: Option<&str>,
) -> Result<(), OrchestratorError> {
    let key = match override_env {
        Some(env) => env.to_string(),
        None if !job.environment_id.is_empty() => job.environment_id.clone(),
        None => job.environment_name.clone(),
    };
    let environment = find_environment(state, &key).await?;
    job.environment_id = environment.id;
    job.environment_name = environment.name;
    Ok(())
}

async fn deploy(
    options: &AppOptions,
    state: &AppState,
    args: DeployArgs,
    cancel: &Cancellation,
) -> Result<RunStatus, OrchestratorError> {
    let mut job = match &args.profile {
        Some(profile) => {
            let mut job = load_profile(&options.layout.profile_file(profile)).await?;
            fill_environment(state, &mut job, args.environment.as_deref()).await?;
            if let Some(channel) = &args.channel {
                job.override_channel(channel);
            }
            job
        }
        None => {
            let name = args.environment.as_deref().ok_or_else(|| {
                OrchestratorError::ValidationError(
                    "--environment or --profile is required to deploy".to_string(),
                )
            })?;
            let environment = find_environment(state, name).await?;
            build_job(state, &environment, args.channel.as_deref(), cancel).await?
        }
    };
    job.deploy_async |= args.deploy_async;
    job.fallback_to_default_channel |= args.fallback;
    job.prioritise |= args.prioritise;

    if job.project_deployments.is_empty() {
        state.reporter.write_line("Nothing to deploy");
        return Ok(RunStatus::Completed);
    }

    if check(state, &job).await? == RunStatus::Unsafe {
        return Ok(RunStatus::Unsafe);
    }

    state
        .resolver
        .resolve_packages_for_deployment(&mut job, options.default_fallback_channel.as_deref())
        .await?;

    let result = state.orchestrator.run(job, cancel).await?;
    info!(
        "Run {} finished: {} submitted, {} succeeded, {} failed",
        result.run_id,
        result.submitted,
        result.succeeded.len(),
        result.failed.len()
    );
    if result.cancelled {
        return Err(OrchestratorError::Cancelled);
    }
    if let Some(error) = result.polling_error {
        return Err(OrchestratorError::DeployError(format!(
            "task polling stopped: {}",
            error
        )));
    }
    Ok(RunStatus::Completed)
}
