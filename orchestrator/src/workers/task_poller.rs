//! Polling worker tracking asynchronously submitted deployment tasks

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::deploy::cancel::Cancellation;
use crate::deploy::reporter::Reporter;
use crate::http::service::DeploymentService;
use crate::models::task::{DeploymentTask, TaskState};

/// Task poller options
#[derive(Debug, Clone)]
pub struct Options {
    /// Delay between polling rounds
    pub interval: Duration,

    /// How many recent tasks to fetch per round
    pub batch_size: usize,

    /// Stop after this many rounds in a row fail to list tasks
    pub max_consecutive_failures: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            batch_size: 100,
            max_consecutive_failures: 10,
        }
    }
}

/// A submitted task and the project it deploys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub project_id: String,
    pub project_name: String,
    pub task: DeploymentTask,
}

/// Tasks still awaiting a terminal state, keyed by task ID
#[derive(Debug, Default)]
pub struct TaskRegistry {
    entries: BTreeMap<String, Registration>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, registration: Registration) {
        self.entries
            .insert(registration.task.id.clone(), registration);
    }

    pub fn remove(&mut self, task_id: &str) -> Option<Registration> {
        self.entries.remove(task_id)
    }

    pub fn task_ids(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn update(&mut self, task: &DeploymentTask) {
        if let Some(registration) = self.entries.get_mut(&task.id) {
            registration.task = task.clone();
        }
    }

    fn drain(&mut self) -> Vec<Registration> {
        std::mem::take(&mut self.entries).into_values().collect()
    }
}

/// What the poller observed
#[derive(Debug, Default)]
pub struct PollOutcome {
    pub succeeded: Vec<Registration>,

    /// Failed registrations, with the task details fetched after failure
    pub failed: Vec<Registration>,

    /// Registrations that vanished from the recent task list
    pub missing: Vec<Registration>,

    /// Registrations still pending when polling was cancelled
    pub abandoned: Vec<Registration>,

    pub rounds: usize,

    /// Last listing error when polling stopped because the platform kept failing
    pub gave_up: Option<String>,
}

/// Poll recent tasks until every registration reaches a terminal state.
///
/// Each round fetches one batch of recent tasks. A registered task missing
/// from the batch is dropped as unresolved, `Done` counts as success and
/// `Failed` triggers a details fetch before being recorded as failed.
/// Polling stops early on cancellation or when listing fails
/// `max_consecutive_failures` times in a row; pending tasks are then
/// returned as abandoned.
pub async fn run<S, F>(
    options: &Options,
    service: &dyn DeploymentService,
    reporter: &dyn Reporter,
    registry: &mut TaskRegistry,
    sleep_fn: S,
    cancel: &Cancellation,
) -> PollOutcome
where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    let submitted = registry.len();
    let mut outcome = PollOutcome::default();
    let mut failures = 0;
    info!("Task poller tracking {} deployments...", submitted);

    while !registry.is_empty() {
        if cancel.is_cancelled() {
            warn!("Task poller cancelled with {} tasks pending", registry.len());
            break;
        }
        outcome.rounds += 1;

        match service.list_recent_tasks(0, options.batch_size).await {
            Ok(tasks) => {
                failures = 0;
                let batch: HashMap<&str, &DeploymentTask> =
                    tasks.iter().map(|t| (t.id.as_str(), t)).collect();
                process_batch(service, reporter, registry, &batch, &mut outcome).await;
            }
            Err(e) => {
                failures += 1;
                error!(
                    "Failed to fetch recent tasks ({}/{}): {}",
                    failures, options.max_consecutive_failures, e
                );
                if failures >= options.max_consecutive_failures.max(1) {
                    error!("Task poller giving up with {} tasks pending", registry.len());
                    outcome.gave_up = Some(e.to_string());
                    break;
                }
            }
        }

        reporter.write_progress(
            submitted - registry.len(),
            submitted,
            "Waiting for deployments to finish",
        );

        if registry.is_empty() {
            break;
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                warn!("Task poller cancelled while waiting");
                break;
            }
            _ = sleep_fn(options.interval) => {
                // Continue with next round
            }
        }
    }

    outcome.abandoned = registry.drain();
    reporter.stop_animation();
    info!(
        "Task poller finished after {} rounds: {} succeeded, {} failed, {} missing, {} abandoned",
        outcome.rounds,
        outcome.succeeded.len(),
        outcome.failed.len(),
        outcome.missing.len(),
        outcome.abandoned.len()
    );
    outcome
}

async fn process_batch(
    service: &dyn DeploymentService,
    reporter: &dyn Reporter,
    registry: &mut TaskRegistry,
    batch: &HashMap<&str, &DeploymentTask>,
    outcome: &mut PollOutcome,
) {
    for task_id in registry.task_ids() {
        let Some(task) = batch.get(task_id.as_str()) else {
            warn!("Task {} is missing from the recent task list, no longer tracking it", task_id);
            if let Some(registration) = registry.remove(&task_id) {
                reporter.clean_current_line();
                reporter.write_line(&format!(
                    "Lost track of the deployment of {} (task {})",
                    registration.project_name, task_id
                ));
                outcome.missing.push(registration);
            }
            continue;
        };

        match task.state {
            TaskState::Done => {
                if let Some(mut registration) = registry.remove(&task_id) {
                    registration.task = (*task).clone();
                    reporter.clean_current_line();
                    reporter.write_line(&format!("{} deployed successfully", registration.project_name));
                    outcome.succeeded.push(registration);
                }
            }
            TaskState::Failed => {
                let details = match service.get_task(&task_id).await {
                    Ok(details) => details,
                    Err(e) => {
                        error!("Failed to fetch details of task {}: {}", task_id, e);
                        (*task).clone()
                    }
                };
                if let Some(mut registration) = registry.remove(&task_id) {
                    registration.task = details;
                    reporter.clean_current_line();
                    reporter.write_line(&format!("{} failed to deploy", registration.project_name));
                    outcome.failed.push(registration);
                }
            }
            TaskState::Queued | TaskState::InProgress => {
                debug!(
                    "Task {} is {} ({}%)",
                    task_id, task.state, task.percentage_complete
                );
                registry.update(task);
            }
        }
    }
}
