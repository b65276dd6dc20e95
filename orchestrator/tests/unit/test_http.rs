//! REST client tests against a mock platform

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rollout::errors::OrchestratorError;
use rollout::http::client::{HttpClient, API_KEY_HEADER};
use rollout::http::service::DeploymentService;
use rollout::models::environment::Environment;
use rollout::models::task::TaskState;

use crate::support::channel;

fn client(server: &MockServer) -> HttpClient {
    HttpClient::new(&server.uri(), SecretString::from("API-TEST".to_string())).unwrap()
}

fn release_json(id: &str, version: &str) -> serde_json::Value {
    json!({"id": id, "project_id": "Projects-1", "version": version})
}

#[tokio::test]
async fn test_missing_resource_maps_to_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/environments/Environments-9"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server)
        .get_optional::<Environment>("/environments/Environments-9")
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_environment_found_by_name_after_404() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/environments/test"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/environments/all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "Environments-1", "name": "Test"},
            {"id": "Environments-2", "name": "Production"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let environment = client(&server).get_environment("test").await.unwrap();
    assert_eq!(environment, Some(Environment::new("Environments-1", "Test")));
}

#[tokio::test]
async fn test_error_status_maps_to_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks/ServerTasks-1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database unavailable"))
        .mount(&server)
        .await;

    let result = client(&server).get_task("ServerTasks-1").await;
    match result {
        Err(OrchestratorError::ApiError { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "database unavailable");
        }
        other => panic!("expected an API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_requests_carry_api_key_and_match_channel_names() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects/Projects-1/channels"))
        .and(header(API_KEY_HEADER, "API-TEST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"id": "Channels-1", "name": "Stable", "version_range": "[2.0,3.0)"},
                {"id": "Channels-2", "name": "Beta"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let found = client(&server)
        .get_channel_by_name("Projects-1", "stable")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, "Channels-1");
    assert_eq!(found.version_range.as_deref(), Some("[2.0,3.0)"));
}

#[tokio::test]
async fn test_channel_with_releases_is_not_deleted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/channels/Channels-1/releases"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [release_json("Releases-1", "2.1.0"), release_json("Releases-2", "2.2.0")]
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/channels/Channels-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let deletion = client(&server)
        .delete_channel(&channel("Channels-1", "Stable", "Projects-1", None))
        .await
        .unwrap();
    assert!(!deletion.success);
    assert_eq!(deletion.blocking_releases, ["2.1.0", "2.2.0"]);
}

#[tokio::test]
async fn test_unused_channel_is_deleted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/channels/Channels-1/releases"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/channels/Channels-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let deletion = client(&server)
        .delete_channel(&channel("Channels-1", "Stable", "Projects-1", None))
        .await
        .unwrap();
    assert!(deletion.success);
}

#[tokio::test]
async fn test_recent_tasks_are_paged() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks"))
        .and(query_param("skip", "0"))
        .and(query_param("take", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"id": "ServerTasks-2", "state": "Executing", "percentage_complete": 40},
                {"id": "ServerTasks-1", "state": "Success", "links": {"Web": "/app#/tasks/ServerTasks-1"}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tasks = client(&server).list_recent_tasks(0, 2).await.unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].state, TaskState::InProgress);
    assert_eq!(tasks[1].state, TaskState::Done);
    assert_eq!(tasks[1].web_link(), Some("/app#/tasks/ServerTasks-1"));
}

#[tokio::test]
async fn test_version_rule_requires_range_and_tag() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/channels/rule-test"))
        .and(body_json(json!({
            "version": "2.1.0-beta",
            "version_range": "[2.0,3.0)",
            "pre_release_tag": "^beta$"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "satisfies_version_range": true,
            "satisfies_pre_release_tag": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut beta = channel("Channels-2", "Beta", "Projects-1", Some("[2.0,3.0)"));
    beta.version_tag = Some("^beta$".to_string());
    let valid = client(&server)
        .validate_version(&beta, "2.1.0-beta")
        .await
        .unwrap();
    assert!(!valid);
}

#[tokio::test]
async fn test_raw_task_log_is_returned_as_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks/ServerTasks-1/raw"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Step 1 failed\n"))
        .mount(&server)
        .await;

    let log = client(&server).get_task_raw_log("ServerTasks-1").await.unwrap();
    assert_eq!(log, "Step 1 failed\n");
}
