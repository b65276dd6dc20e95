//! Rollout - Entry Point
//!
//! Plans, validates and runs multi-project deployments against a release
//! platform, and garbage-collects stale release channels.

use std::collections::HashMap;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use rollout::app::options::AppOptions;
use rollout::app::run::{error_exit_code, run, Command, DeployArgs};
use rollout::app::state::AppState;
use rollout::deploy::cancel::{CancelHandle, Cancellation};
use rollout::deploy::reporter::ConsoleReporter;
use rollout::errors::OrchestratorError;
use rollout::logs::{init_logging, LogOptions};
use rollout::storage::layout::StorageLayout;
use rollout::storage::settings::Settings;
use rollout::utils::version_info;

use tracing::{error, info, warn};

const USAGE: &str = "usage: rollout [--settings=<dir>] <command>

commands:
  --plan --environment=<env> --profile=<name> [--channel=<name>]
  --validate --profile=<name>
  --deploy (--profile=<name> | --environment=<env>) [--channel=<name>] [--async] [--fallback] [--priority]
  --cleanup-channels [--group=<filter>] [--test-mode]
  --version";

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("{}", e),
        }
        return ExitCode::SUCCESS;
    }

    let command = match parse_command(&cli_args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}\n\n{}", e, USAGE);
            return ExitCode::from(error_exit_code(&e));
        }
    };

    // Retrieve the settings file
    let layout = match cli_args.get("settings") {
        Some(dir) => StorageLayout::new(dir),
        None => StorageLayout::default(),
    };
    let settings_file = layout.settings_file();
    let settings = match settings_file.read_json::<Settings>().await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!(
                "Unable to read settings file {}: {}",
                settings_file.path().display(),
                e
            );
            return ExitCode::from(2);
        }
    };

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        log_dir: Some(layout.logs_dir()),
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    if let Err(e) = settings.validate() {
        error!("Invalid settings: {}", e);
        return ExitCode::from(error_exit_code(&e));
    }

    let options = AppOptions::from_settings(layout, &settings);
    let state = match AppState::init(&options, Arc::new(ConsoleReporter::new())) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize: {}", e);
            return ExitCode::from(error_exit_code(&e));
        }
    };

    let (handle, cancel) = Cancellation::new();
    tokio::spawn(cancel_on_shutdown_signal(handle));

    info!("Running rollout {}", version_info().version);
    match run(command, &options, &state, &cancel).await {
        Ok(status) => ExitCode::from(status.exit_code()),
        Err(OrchestratorError::Cancelled) => {
            warn!("Cancelled");
            ExitCode::from(130)
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::from(error_exit_code(&e))
        }
    }
}

fn parse_command(cli_args: &HashMap<String, String>) -> Result<Command, OrchestratorError> {
    let flag = |key: &str| cli_args.get(key).is_some_and(|v| v == "true");
    let value = |key: &str| {
        cli_args
            .get(key)
            .filter(|v| !v.is_empty() && v.as_str() != "true")
            .cloned()
    };
    let required = |key: &str| {
        value(key).ok_or_else(|| OrchestratorError::ValidationError(format!("--{}=<value> is required", key)))
    };

    if flag("plan") {
        return Ok(Command::Plan {
            environment: required("environment")?,
            channel: value("channel"),
            profile: required("profile")?,
        });
    }
    if flag("validate") {
        return Ok(Command::Validate {
            profile: required("profile")?,
        });
    }
    if flag("deploy") {
        return Ok(Command::Deploy(DeployArgs {
            profile: value("profile"),
            environment: value("environment"),
            channel: value("channel"),
            deploy_async: flag("async"),
            fallback: flag("fallback"),
            prioritise: flag("priority"),
        }));
    }
    if flag("cleanup-channels") {
        return Ok(Command::CleanupChannels {
            group: value("group"),
            test_mode: flag("test-mode"),
        });
    }
    Err(OrchestratorError::ValidationError("no command given".to_string()))
}

async fn cancel_on_shutdown_signal(handle: CancelHandle) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                warn!("Unable to listen for SIGTERM: {}", e);
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, cancelling...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, cancelling...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Unable to listen for Ctrl+C: {}", e);
            return;
        }
        info!("Ctrl+C received, cancelling...");
    }

    handle.cancel();
}
