//! Cache unit tests

use std::sync::Arc;
use std::time::Duration;

use rollout::cache::service::CachedService;
use rollout::cache::ttl::TtlCache;
use rollout::http::service::DeploymentService;

use crate::support::{channel, environment, FakeService, FakeState};

#[test]
fn test_ttl_cache_expiry() {
    let cache: TtlCache<String> = TtlCache::new(Duration::from_secs(60));
    cache.set("a", "kept".to_string());
    cache.set_with_ttl("b", "expired".to_string(), Duration::ZERO);

    assert_eq!(cache.get("a").as_deref(), Some("kept"));
    assert!(cache.get("b").is_none());
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_reference_data_is_cached() {
    let fake = FakeService::new(FakeState {
        environments: vec![environment("Environments-1", "Test")],
        ..Default::default()
    });
    let cached = CachedService::new(fake.clone(), Duration::from_millis(200));

    let first = cached.get_environment("Environments-1").await.unwrap().unwrap();
    fake.with(|s| s.environments[0].name = "Renamed".to_string());
    let second = cached.get_environment("Environments-1").await.unwrap().unwrap();
    assert_eq!(first, second);

    tokio::time::sleep(Duration::from_millis(300)).await;
    let third = cached.get_environment("Environments-1").await.unwrap().unwrap();
    assert_eq!(third.name, "Renamed");
}

#[tokio::test]
async fn test_channel_entries_dropped_on_delete() {
    let fake = FakeService::new(FakeState {
        channels: vec![channel("Channels-1", "Stable", "Projects-1", None)],
        ..Default::default()
    });
    let cached: Arc<dyn DeploymentService> =
        Arc::new(CachedService::new(fake.clone(), Duration::from_secs(60)));

    let stable = cached
        .get_channel_by_name("Projects-1", "stable")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cached.list_channels("Projects-1").await.unwrap().len(), 1);

    assert!(cached.delete_channel(&stable).await.unwrap().success);
    assert!(cached
        .get_channel_by_name("Projects-1", "Stable")
        .await
        .unwrap()
        .is_none());
    assert!(cached.list_channels("Projects-1").await.unwrap().is_empty());
}
