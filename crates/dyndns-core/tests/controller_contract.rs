//! Contract Test: Controller
//!
//! The controller turns store notifications and engine actions into cycles.
//!
//! Constraints verified:
//! - Every record known at startup is reconciled once
//! - A desired-state change triggers a new cycle
//! - Status writes by the engine do not trigger cycles
//! - A failed status write is retried after the fixed delay
//! - Shutdown completes while cycles are pending

mod common;

use common::*;
use dyndns_core::config::WorkerConfig;
use dyndns_core::model::RecordKey;
use dyndns_core::traits::{RecordStore, Secret};
use dyndns_core::{
    Controller, MemoryRecordStore, MemorySecretStore, Reconciler, TracingEventSink,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// Poll `condition` until it holds or two seconds have passed
async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

fn config() -> WorkerConfig {
    WorkerConfig {
        workers: 2,
        ..WorkerConfig::default()
    }
}

#[tokio::test]
async fn startup_reconciles_every_record() {
    let fixture = Fixture::new("1.2.3.4").await;
    fixture.seed(dynamic_spec(), Default::default()).await;
    fixture
        .records
        .apply(
            &RecordKey::new("default", "office"),
            manual_spec("9.9.9.9"),
        )
        .await
        .unwrap();

    let controller = Controller::new(fixture.reconciler.clone(), &config());
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle = tokio::spawn(async move { controller.run(shutdown_rx).await });

    let updater = fixture.updater.clone();
    assert!(wait_until(|| updater.update_call_count() == 2).await);

    // Both records succeeded; dynamic is requeued minutes out, manual is
    // terminal. No further calls while we wait.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(fixture.updater.update_call_count(), 2);
    assert_eq!(fixture.store.update_status_call_count(), 2);

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn desired_state_change_triggers_cycle() {
    let fixture = Fixture::new("1.2.3.4").await;
    fixture.seed(manual_spec("9.9.9.9"), Default::default()).await;

    let controller = Controller::new(fixture.reconciler.clone(), &config());
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle = tokio::spawn(async move { controller.run(shutdown_rx).await });

    let updater = fixture.updater.clone();
    assert!(wait_until(|| updater.update_call_count() == 1).await);

    fixture
        .records
        .apply(&key(), manual_spec("8.8.8.8"))
        .await
        .unwrap();

    assert!(wait_until(|| updater.update_call_count() == 2).await);
    assert_eq!(fixture.updater.calls()[1].ip, ip("8.8.8.8"));

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn failed_status_write_is_retried() {
    let records = MemoryRecordStore::new();
    let store = Arc::new(FlakyStatusStore::new(records.clone()));
    store.fail_status_writes(true);

    let secrets = MemorySecretStore::new();
    secrets
        .insert("default", "strato", Secret::with_password("pw"))
        .await;

    let resolver = Arc::new(MockIpResolver::new(ip("1.2.3.4")));
    let updater = Arc::new(MockDnsUpdater::new());

    let reconciler = Reconciler::new(
        store.clone(),
        Arc::new(secrets),
        resolver,
        updater.clone(),
        Arc::new(TracingEventSink),
    )
    .with_status_retry(Duration::from_millis(50));

    records.apply(&key(), dynamic_spec()).await.unwrap();

    let controller = Controller::new(Arc::new(reconciler), &config());
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle = tokio::spawn(async move { controller.run(shutdown_rx).await });

    assert!(wait_until(|| store.update_status_call_count() >= 2).await);
    store.fail_status_writes(false);

    let mut recovered = false;
    for _ in 0..200 {
        let record = records.get(&key()).await.unwrap().unwrap();
        if record.status.was_successful() {
            recovered = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(recovered, "status should be written once the store recovers");

    // Every retry re-applies: the update is at-least-once
    assert!(updater.update_call_count() >= 3);

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn shutdown_with_idle_queue() {
    let fixture = Fixture::new("1.2.3.4").await;

    let controller = Controller::new(fixture.reconciler.clone(), &config());
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle = tokio::spawn(async move { controller.run(shutdown_rx).await });

    tokio::time::sleep(Duration::from_millis(20)).await;
    shutdown_tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(1), handle).await;
    assert!(result.is_ok(), "controller must stop promptly");
}
