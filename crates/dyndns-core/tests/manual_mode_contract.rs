//! Contract Test: Manual Mode
//!
//! A record carrying an explicit address is applied once and then left
//! alone until its desired state changes.
//!
//! Constraints verified:
//! - The explicit address is used; the IP resolver is never called
//! - An already-applied address is not pushed again, status still refreshed
//! - A successful manual cycle is terminal
//! - Switching to dynamic mode resolves the public address

mod common;

use common::*;
use dyndns_core::model::Mode;
use dyndns_core::traits::reason;
use std::time::Duration;

#[tokio::test]
async fn static_ip_is_applied_and_terminal() {
    let fixture = Fixture::new("1.2.3.4").await;
    fixture.seed(manual_spec("9.9.9.9"), Default::default()).await;

    let action = fixture.reconciler.reconcile(&key(), now()).await.unwrap();

    assert!(action.is_terminal());
    assert_eq!(fixture.resolver.resolve_call_count(), 0);

    let calls = fixture.updater.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].ip, ip("9.9.9.9"));

    let status = fixture.status().await;
    assert_eq!(status.mode, Some(Mode::Manual));
    assert_eq!(status.ip_address, Some(ip("9.9.9.9")));
    assert_eq!(status.last_reconciliation_result, Some(true));
}

#[tokio::test]
async fn applied_static_ip_is_not_pushed_again() {
    let mut fixture = Fixture::new("1.2.3.4").await;
    fixture
        .seed(manual_spec("9.9.9.9"), prior_status("9.9.9.9", true, minutes_ago(60)))
        .await;

    let action = fixture.reconciler.reconcile(&key(), now()).await.unwrap();

    assert!(action.is_terminal());
    assert_eq!(fixture.updater.update_call_count(), 0);
    assert_eq!(fixture.event_reasons(), vec![reason::UPDATE_SKIPPED]);

    // Status is still refreshed
    let status = fixture.status().await;
    assert_eq!(status.last_reconciliation_loop, Some(now()));
    assert_eq!(status.mode, Some(Mode::Manual));
}

#[tokio::test]
async fn switching_to_dynamic_resolves_public_ip() {
    let fixture = Fixture::new("1.2.3.4").await;
    fixture
        .seed(manual_spec("9.9.9.9"), prior_status("9.9.9.9", true, minutes_ago(1)))
        .await;

    // Operator removes the explicit address
    fixture.records.apply(&key(), dynamic_spec()).await.unwrap();

    let action = fixture.reconciler.reconcile(&key(), now()).await.unwrap();

    // Previous cycle succeeded one minute ago: dynamic mode is now gated
    assert_eq!(action.requeue_after(), Some(Duration::from_secs(4 * 60)));
    assert_eq!(fixture.resolver.resolve_call_count(), 0);

    let later = now() + chrono::Duration::minutes(4);
    let action = fixture.reconciler.reconcile(&key(), later).await.unwrap();

    assert_eq!(action.requeue_after(), Some(Duration::from_secs(5 * 60)));
    assert_eq!(fixture.resolver.resolve_call_count(), 1);
    let status = fixture.status().await;
    assert_eq!(status.mode, Some(Mode::Dynamic));
    assert_eq!(status.ip_address, Some(ip("1.2.3.4")));
}
