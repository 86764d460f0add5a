use chrono::{Duration, Utc};
use instance_reaper::background::sweep_scheduler;
use instance_reaper::compute::InMemoryCompute;
use instance_reaper::config::AppConfig;
use instance_reaper::models::instance::Instance;
use instance_reaper::state::AppState;
use std::sync::Arc;
use std::time::Duration as StdDuration;

fn expired(name: &str) -> Instance {
    Instance::new(name, "us-central1-a", (Utc::now() - Duration::minutes(45)).to_rfc3339())
        .with_metadata("ttl", "30")
}

#[tokio::test]
async fn test_scheduler_sweeps_until_shutdown() {
    let compute = Arc::new(InMemoryCompute::default());
    compute.insert(expired("vm-1")).await;
    let state = AppState::with_backend(AppConfig::for_project("sched-project"), compute.clone());

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let handle = tokio::spawn(sweep_scheduler::run(
        state,
        StdDuration::from_millis(10),
        shutdown_rx,
    ));

    tokio::time::sleep(StdDuration::from_millis(200)).await;
    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(StdDuration::from_secs(5), handle)
        .await
        .expect("scheduler did not stop")
        .unwrap();

    // Deleted once; later ticks see an empty inventory.
    assert_eq!(compute.delete_calls().await.len(), 1);
    assert!(compute.instance_names().await.is_empty());
}

#[tokio::test]
async fn test_scheduler_keeps_running_after_failed_sweep() {
    let compute = Arc::new(InMemoryCompute::default());
    compute.insert(expired("vm-stuck")).await;
    compute.fail_delete_of("vm-stuck").await;
    let state = AppState::with_backend(AppConfig::for_project("sched-project"), compute.clone());

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let handle = tokio::spawn(sweep_scheduler::run(
        state,
        StdDuration::from_millis(10),
        shutdown_rx,
    ));

    tokio::time::sleep(StdDuration::from_millis(200)).await;
    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();

    assert!(compute.delete_calls().await.len() >= 2);
}
