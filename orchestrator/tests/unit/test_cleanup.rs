//! Channel garbage collector tests

use std::collections::HashMap;
use std::sync::Arc;

use rollout::deploy::cleanup::{ChannelCleaner, Options};
use rollout::models::project::ProjectGroup;

use crate::support::{channel, project, step, FakeService, FakeState, RecordingReporter};

fn state() -> FakeState {
    let mut other = project("Projects-2", "Worker");
    other.project_group_id = "ProjectGroups-2".to_string();
    FakeState {
        projects: vec![project("Projects-1", "Web"), other],
        groups: vec![
            ProjectGroup {
                id: "ProjectGroups-1".to_string(),
                name: "Frontend".to_string(),
            },
            ProjectGroup {
                id: "ProjectGroups-2".to_string(),
                name: "Backend".to_string(),
            },
        ],
        channels: vec![
            channel("Channels-1", "Stable", "Projects-1", Some("[1.0,2.0)")),
            channel("Channels-X", "Legacy", "Projects-1", Some("[0.1,0.2)")),
            channel("Channels-Y", "Old", "Projects-2", Some("[0.1,0.2)")),
        ],
        packages: HashMap::from([
            ("Projects-1".to_string(), vec![step("S", &["1.9", "1.4"])]),
            ("Projects-2".to_string(), vec![step("W", &["3.0"])]),
        ]),
        ..Default::default()
    }
}

fn cleaner(service: Arc<FakeService>) -> ChannelCleaner {
    ChannelCleaner::new(service, Arc::new(RecordingReporter::default()), Options::default())
}

#[tokio::test]
async fn test_refused_deletion_lists_blocking_releases() {
    let mut state = state();
    state.channel_releases = HashMap::from([(
        "Channels-X".to_string(),
        vec!["0.1.3".to_string(), "0.1.4".to_string()],
    )]);
    let service = FakeService::new(state);

    let report = cleaner(service.clone()).cleanup(Some("front"), false).await.unwrap();

    assert!(!report.all_succeeded());
    assert_eq!(report.candidates.len(), 1);
    assert_eq!(report.candidates[0].channel_id, "Channels-X");
    assert_eq!(report.refused.len(), 1);
    assert_eq!(report.refused[0].channel_name, "Legacy");
    assert_eq!(report.refused[0].blocking_releases, ["0.1.3", "0.1.4"]);
    assert!(service.with(|s| s.channels.iter().any(|c| c.id == "Channels-X")));
}

#[tokio::test]
async fn test_unused_channels_are_deleted() {
    let service = FakeService::new(state());

    let report = cleaner(service.clone()).cleanup(None, false).await.unwrap();

    assert!(report.all_succeeded());
    let deleted: Vec<_> = report.deleted.iter().map(|c| c.channel_id.as_str()).collect();
    assert_eq!(deleted, ["Channels-X", "Channels-Y"]);
    service.with(|s| {
        assert_eq!(s.channels.len(), 1);
        assert_eq!(s.channels[0].id, "Channels-1");
    });
}

#[tokio::test]
async fn test_test_mode_only_reports() {
    let service = FakeService::new(state());

    let report = cleaner(service.clone()).cleanup(None, true).await.unwrap();

    assert!(report.test_mode);
    assert_eq!(report.candidates.len(), 2);
    assert!(report.deleted.is_empty());
    assert!(service.with(|s| s.deleted_channels.is_empty()));
}

#[tokio::test]
async fn test_group_filter_limits_projects() {
    let service = FakeService::new(state());

    let report = cleaner(service.clone()).cleanup(Some("BACK"), false).await.unwrap();

    let deleted: Vec<_> = report.deleted.iter().map(|c| c.project_id.as_str()).collect();
    assert_eq!(deleted, ["Projects-2"]);
    assert!(service.with(|s| s.channels.iter().any(|c| c.id == "Channels-X")));
}
