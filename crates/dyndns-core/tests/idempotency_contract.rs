//! Contract Test: Update Decision & Idempotency
//!
//! The remote update call is made only when the candidate address differs
//! from the last applied one or the previous cycle failed. Status is the
//! only memory between cycles, so the same decision holds across restarts.
//!
//! Constraints verified:
//! - An unchanged address after a success makes no remote call
//! - A changed address is pushed with username = fqdn
//! - Status is refreshed even when the call is skipped
//! - A restart with a persisted status does not push again

mod common;

use common::*;
use dyndns_core::engine::Action;
use dyndns_core::model::{Mode, RecordKey};
use dyndns_core::traits::{RecordStore, UpdateOutcome, reason};
use dyndns_core::{FileRecordStore, FileSecretStore, Reconciler, TracingEventSink};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use tokio_test::assert_ok;

#[tokio::test]
async fn unchanged_ip_skips_remote_call() {
    let mut fixture = Fixture::new("1.2.3.4").await;
    fixture
        .seed(dynamic_spec(), prior_status("1.2.3.4", true, minutes_ago(6)))
        .await;

    let action = assert_ok!(fixture.reconciler.reconcile(&key(), now()).await);

    assert_eq!(fixture.updater.update_call_count(), 0);
    assert_eq!(action, Action::requeue(Duration::from_secs(5 * 60)));
    assert_eq!(fixture.event_reasons(), vec![reason::UPDATE_SKIPPED]);

    let status = fixture.status().await;
    assert_eq!(status.ip_address, Some(ip("1.2.3.4")));
    assert_eq!(status.last_reconciliation_loop, Some(now()));
    assert_eq!(status.last_reconciliation_result, Some(true));
    assert_eq!(status.mode, Some(Mode::Dynamic));
}

#[tokio::test]
async fn changed_ip_is_pushed_once() {
    let mut fixture = Fixture::new("5.6.7.8").await;
    fixture
        .seed(dynamic_spec(), prior_status("1.2.3.4", true, minutes_ago(6)))
        .await;

    fixture.reconciler.reconcile(&key(), now()).await.unwrap();

    let calls = fixture.updater.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].hostname, "home.example.com");
    assert_eq!(calls[0].username, "home.example.com");
    assert_eq!(calls[0].password, "s3cret");
    assert_eq!(calls[0].ip, ip("5.6.7.8"));

    assert_eq!(fixture.status().await.ip_address, Some(ip("5.6.7.8")));
    assert_eq!(fixture.event_reasons(), vec![reason::UPDATE_COMPLETED]);

    // The interval has passed again, address unchanged: nothing to push
    let later = now() + chrono::Duration::minutes(5);
    fixture.reconciler.reconcile(&key(), later).await.unwrap();
    assert_eq!(fixture.updater.update_call_count(), 1);
}

#[tokio::test]
async fn first_cycle_always_pushes() {
    let fixture = Fixture::new("1.2.3.4").await;
    fixture
        .seed(dynamic_spec(), Default::default())
        .await;

    fixture.reconciler.reconcile(&key(), now()).await.unwrap();

    assert_eq!(fixture.updater.update_call_count(), 1);
    let status = fixture.status().await;
    assert!(status.enabled);
    assert_eq!(status.ip_address, Some(ip("1.2.3.4")));
}

#[tokio::test]
async fn nochg_counts_as_success() {
    let fixture = Fixture::new("1.2.3.4").await;
    fixture.updater.respond_with(UpdateOutcome::NoChange);
    fixture
        .seed(dynamic_spec(), Default::default())
        .await;

    fixture.reconciler.reconcile(&key(), now()).await.unwrap();

    let status = fixture.status().await;
    assert_eq!(status.last_reconciliation_result, Some(true));
    assert_eq!(status.ip_address, Some(ip("1.2.3.4")));
}

#[tokio::test]
async fn restart_with_persisted_status_does_not_push_again() {
    let dir = tempdir().unwrap();
    let records_path = dir.path().join("records.json");
    let status_path = dir.path().join("status.json");
    let secrets_path = dir.path().join("secrets.json");

    tokio::fs::write(
        &records_path,
        r#"{ "records": [{ "namespace": "default", "name": "home",
              "spec": { "fqdn": "home.example.com", "password": { "name": "strato" } } }] }"#,
    )
    .await
    .unwrap();
    tokio::fs::write(&secrets_path, r#"{ "default/strato": { "password": "pw" } }"#)
        .await
        .unwrap();

    let resolver = Arc::new(MockIpResolver::new(ip("1.2.3.4")));
    let updater = Arc::new(MockDnsUpdater::new());
    let key = RecordKey::new("default", "home");

    let build = |store: FileRecordStore| {
        Reconciler::new(
            Arc::new(store),
            Arc::new(FileSecretStore::new(&secrets_path)),
            resolver.clone(),
            updater.clone(),
            Arc::new(TracingEventSink),
        )
    };

    // First process lifetime
    {
        let store = FileRecordStore::new(&records_path, &status_path).await.unwrap();
        let reconciler = build(store);
        reconciler.reconcile(&key, now()).await.unwrap();
        assert_eq!(updater.update_call_count(), 1);
    }

    // Second lifetime, one interval later, same public address
    let store = FileRecordStore::new(&records_path, &status_path).await.unwrap();
    let persisted = store.get(&key).await.unwrap().unwrap().status;
    assert_eq!(persisted.ip_address, Some(ip("1.2.3.4")));

    let reconciler = build(store);
    let later = now() + chrono::Duration::minutes(5);
    reconciler.reconcile(&key, later).await.unwrap();

    assert_eq!(updater.update_call_count(), 1, "restart must not re-push an applied address");
}
