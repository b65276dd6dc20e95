//! Lifecycle validator tests

use std::collections::HashMap;

use rollout::deploy::lifecycle::LifecycleValidator;
use rollout::models::deployment::{EnvironmentDeployment, ProjectDeployment};
use rollout::models::release::ReleaseDeployment;

use crate::support::{lifecycle, phase, FakeService, FakeState};

fn deployment(project_id: &str, lifecycle_id: &str, release_id: &str) -> ProjectDeployment {
    ProjectDeployment {
        project_id: project_id.to_string(),
        project_name: format!("Project {}", project_id),
        lifecycle_id: lifecycle_id.to_string(),
        release_id: release_id.to_string(),
        ..Default::default()
    }
}

fn job(environment_id: &str, projects: Vec<ProjectDeployment>) -> EnvironmentDeployment {
    EnvironmentDeployment {
        environment_id: environment_id.to_string(),
        environment_name: format!("Env {}", environment_id),
        project_deployments: projects,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_empty_lifecycle_is_always_safe() {
    let service = FakeService::new(FakeState {
        lifecycles: HashMap::from([("Lifecycles-1".to_string(), lifecycle("Lifecycles-1", vec![]))]),
        ..Default::default()
    });
    let validator = LifecycleValidator::new(service.clone());

    for env in ["env-A", "env-Prod"] {
        let result = validator
            .check_deployment(&job(env, vec![deployment("Projects-1", "Lifecycles-1", "Releases-1")]))
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.error_message.is_none());
    }
    assert_eq!(service.with(|s| s.history_lookups), 0);
}

#[tokio::test]
async fn test_entry_phase_shortcut_skips_history() {
    let service = FakeService::new(FakeState {
        lifecycles: HashMap::from([(
            "Lifecycles-1".to_string(),
            lifecycle(
                "Lifecycles-1",
                vec![phase(0, &["env-B"]), phase(5, &["env-C"])],
            ),
        )]),
        ..Default::default()
    });
    let validator = LifecycleValidator::new(service.clone());

    let result = validator
        .check_deployment(&job("env-B", vec![deployment("Projects-1", "Lifecycles-1", "Releases-1")]))
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(service.with(|s| s.history_lookups), 0);
}

#[tokio::test]
async fn test_phase_gate_failure() {
    let service = FakeService::new(FakeState {
        lifecycles: HashMap::from([(
            "Lifecycles-1".to_string(),
            lifecycle(
                "Lifecycles-1",
                vec![phase(0, &["env-A"]), phase(1, &["env-A", "env-B"])],
            ),
        )]),
        ..Default::default()
    });
    let validator = LifecycleValidator::new(service.clone());

    let result = validator
        .check_deployment(&job("env-B", vec![deployment("Projects-1", "Lifecycles-1", "Releases-1")]))
        .await
        .unwrap();
    assert!(!result.success);
    let message = result.error_message.unwrap();
    assert!(message.contains("Project Projects-1"));
    assert!(message.contains("Env env-B"));
}

#[tokio::test]
async fn test_history_satisfies_minimum() {
    let service = FakeService::new(FakeState {
        lifecycles: HashMap::from([(
            "Lifecycles-1".to_string(),
            lifecycle(
                "Lifecycles-1",
                vec![phase(0, &["env-A"]), phase(1, &["env-A", "env-B"])],
            ),
        )]),
        release_deployments: HashMap::from([(
            "Releases-1".to_string(),
            vec![ReleaseDeployment {
                id: "Deployments-1".to_string(),
                release_id: "Releases-1".to_string(),
                environment_id: "env-A".to_string(),
                task_id: None,
            }],
        )]),
        ..Default::default()
    });
    let validator = LifecycleValidator::new(service.clone());

    let result = validator
        .check_deployment(&job("env-C", vec![deployment("Projects-1", "Lifecycles-1", "Releases-1")]))
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(service.with(|s| s.history_lookups), 1);
}

#[tokio::test]
async fn test_validation_stops_at_first_unsafe_project() {
    let service = FakeService::new(FakeState {
        lifecycles: HashMap::from([
            (
                "Lifecycles-strict".to_string(),
                lifecycle("Lifecycles-strict", vec![phase(0, &["env-A"]), phase(2, &["env-A"])]),
            ),
            (
                "Lifecycles-open".to_string(),
                lifecycle("Lifecycles-open", vec![phase(0, &["env-A"]), phase(0, &["env-C"])]),
            ),
        ]),
        ..Default::default()
    });
    let validator = LifecycleValidator::new(service.clone());

    let result = validator
        .check_deployment(&job(
            "env-C",
            vec![
                deployment("Projects-1", "Lifecycles-strict", "Releases-1"),
                deployment("Projects-2", "Lifecycles-open", "Releases-2"),
            ],
        ))
        .await
        .unwrap();
    assert!(!result.success);
    assert!(result.error_message.unwrap().contains("Projects-1"));
    // The second project's history is never consulted
    assert_eq!(service.with(|s| s.history_lookups), 1);
}

#[tokio::test]
async fn test_missing_lifecycle_is_an_error() {
    let service = FakeService::new(FakeState::default());
    let validator = LifecycleValidator::new(service);

    let result = validator
        .check_deployment(&job("env-A", vec![deployment("Projects-1", "Lifecycles-9", "")]))
        .await;
    assert!(result.is_err());
}
