//! Reconciliation engine
//!
//! The [`Reconciler`] runs one cycle for one record:
//!
//! ```text
//!  RecordStore::get ──► enabled? ──► resolve_mode ──► should_run_now
//!                                                          │ proceed
//!                                                          ▼
//!                        IpResolver (dynamic) / static ip (manual)
//!                                                          │
//!                                                          ▼
//!                     needs_update ──► SecretStore + DnsUpdater
//!                                                          │
//!                                                          ▼
//!              reconcile_status ──► RecordStore::update_status ──► Action
//! ```
//!
//! ## Failure handling
//!
//! - Record missing or disabled: silent, terminal
//! - IP resolution / update rejected: recorded in status and as a Warning
//!   event, requeued after one interval
//! - Credential secret missing: terminal until the operator fixes it
//! - Status write failed: propagated with a fixed retry delay
//!
//! The engine keeps no state between cycles. Every decision is made from the
//! record fetched at the start of the cycle.

pub mod decision;
pub mod schedule;
pub mod status;

pub use decision::{needs_update, resolve_mode};
pub use schedule::{Action, Gate, interval_duration, next_action, should_run_now};
pub use status::{CycleOutcome, reconcile_status};

use chrono::{DateTime, Utc};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::model::{DesiredRecord, DomainRecord, Mode, RecordKey};
use crate::traits::{
    DnsUpdater, EventSink, EventType, IpResolver, RecordStore, SecretStore, UpdateOutcome,
    UpdateRequest, reason,
};

/// Default delay before retrying a failed status write
pub const DEFAULT_STATUS_RETRY: Duration = Duration::from_secs(15);

/// Reconciliation engine for dyndns records
///
/// The reconciler is cheap to share: the dispatcher wraps it in an `Arc` and
/// calls [`Reconciler::reconcile`] from several workers, one key at a time.
pub struct Reconciler {
    /// Desired records and observed state
    records: Arc<dyn RecordStore>,

    /// Credential lookup
    secrets: Arc<dyn SecretStore>,

    /// Public IP detection for dynamic mode
    ip_resolver: Arc<dyn IpResolver>,

    /// Remote DNS update call
    updater: Arc<dyn DnsUpdater>,

    /// Operator-facing events
    events: Arc<dyn EventSink>,

    /// Delay before the dispatcher retries a failed status write
    status_retry: Duration,
}

impl Reconciler {
    /// Create a new reconciler
    pub fn new(
        records: Arc<dyn RecordStore>,
        secrets: Arc<dyn SecretStore>,
        ip_resolver: Arc<dyn IpResolver>,
        updater: Arc<dyn DnsUpdater>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            records,
            secrets,
            ip_resolver,
            updater,
            events,
            status_retry: DEFAULT_STATUS_RETRY,
        }
    }

    /// Override the status write retry delay
    pub fn with_status_retry(mut self, status_retry: Duration) -> Self {
        self.status_retry = status_retry;
        self
    }

    /// The record store this reconciler reads from
    pub fn records(&self) -> &Arc<dyn RecordStore> {
        &self.records
    }

    /// Run one cycle for `key`
    ///
    /// # Returns
    ///
    /// - `Ok(Action)`: When to look at the record again
    /// - `Err(Error)`: Store failure; `Error::retry_after()` tells the
    ///   dispatcher whether a fixed delay applies
    pub async fn reconcile(&self, key: &RecordKey, now: DateTime<Utc>) -> Result<Action> {
        debug!(key = %key, "starting dyndns update");

        let Some(record) = self.records.get(key).await? else {
            debug!(key = %key, "record not found, nothing to do");
            return Ok(Action::await_change());
        };

        let DomainRecord { spec, status, .. } = record;

        if !spec.enabled {
            debug!(key = %key, fqdn = %spec.fqdn, "record disabled, skipping");
            return Ok(Action::await_change());
        }

        let mode = resolve_mode(&spec);

        if let Gate::Skip { requeue_after } =
            should_run_now(&status, spec.interval_minutes, mode, now)
        {
            info!(
                key = %key,
                fqdn = %spec.fqdn,
                requeue_after_secs = requeue_after.as_secs(),
                "skipped turn"
            );
            return Ok(Action::requeue(requeue_after));
        }

        let outcome = match self.resolve_candidate(&spec).await {
            Ok(candidate) => {
                if needs_update(candidate, status.ip_address, status.was_successful()) {
                    match self.apply_update(key, &spec, mode, candidate).await {
                        Ok(outcome) => outcome,
                        Err(Error::CredentialNotFound(secret)) => {
                            error!(key = %key, secret = %secret, "finding credential secret failed");
                            return Ok(Action::await_change());
                        }
                        Err(e) => return Err(e),
                    }
                } else {
                    info!(
                        key = %key,
                        ip = %candidate,
                        mode = %mode,
                        "updating dyndns skipped, ip is up-to-date"
                    );
                    self.events.record(
                        key,
                        EventType::Normal,
                        reason::UPDATE_SKIPPED,
                        "updating skipped, ip is up-to-date",
                    );
                    CycleOutcome::UpToDate(candidate)
                }
            }
            Err(e) => {
                error!(key = %key, error = %e, "retrieving external ip failed");
                self.events.record(
                    key,
                    EventType::Warning,
                    reason::RETRIEVE_EXTERNAL_IP_FAILED,
                    &e.to_string(),
                );
                CycleOutcome::Failed
            }
        };

        let new_status = reconcile_status(&status, &spec, mode, &outcome, now);

        if let Err(e) = self.records.update_status(key, &new_status).await {
            error!(key = %key, error = %e, "updating status failed");
            return Err(Error::status_persist(
                key.to_string(),
                e.to_string(),
                self.status_retry,
            ));
        }

        let action = next_action(mode, outcome.is_success(), spec.interval_minutes);
        match action.requeue_after() {
            Some(after) => {
                let next_run = chrono::Duration::from_std(after)
                    .map(|after| (now + after).to_rfc2822())
                    .unwrap_or_default();
                info!(
                    key = %key,
                    success = outcome.is_success(),
                    next_run = %next_run,
                    "requeue"
                );
            }
            None => debug!(key = %key, "manual record applied, waiting for changes"),
        }
        debug!(key = %key, "finished dyndns update");

        Ok(action)
    }

    /// Determine the address this cycle should apply
    async fn resolve_candidate(&self, spec: &DesiredRecord) -> Result<IpAddr> {
        match spec.static_ip {
            Some(ip) => Ok(IpAddr::V4(ip)),
            None => {
                debug!(resolver = self.ip_resolver.resolver_name(), "resolving external ip");
                self.ip_resolver.resolve().await
            }
        }
    }

    /// Look up the credential and push `candidate` to the provider
    ///
    /// Provider failures are absorbed into `CycleOutcome::Failed`; credential
    /// lookup failures are returned to the caller.
    async fn apply_update(
        &self,
        key: &RecordKey,
        spec: &DesiredRecord,
        mode: Mode,
        candidate: IpAddr,
    ) -> Result<CycleOutcome> {
        info!(key = %key, ip = %candidate, mode = %mode, "updating dyndns");

        let namespace = spec.credential_ref.namespace_for(key);
        let secret_name = format!("{}/{}", namespace, spec.credential_ref.name);

        let secret = self
            .secrets
            .get(namespace, &spec.credential_ref.name)
            .await?
            .ok_or_else(|| Error::credential_not_found(secret_name.clone()))?;

        let password = secret.password().ok_or_else(|| {
            warn!(key = %key, secret = %secret_name, "secret has no password entry");
            Error::credential_not_found(secret_name.clone())
        })?;

        let request = UpdateRequest::new(&spec.fqdn, password, candidate);

        match self.updater.update(&request).await {
            Ok(result) => {
                match result {
                    UpdateOutcome::Good => info!(key = %key, "updating dyndns completed"),
                    UpdateOutcome::NoChange => {
                        info!(key = %key, "updating dyndns completed, provider reported no change")
                    }
                }
                self.events.record(
                    key,
                    EventType::Normal,
                    reason::UPDATE_COMPLETED,
                    "updating dyndns completed",
                );
                Ok(CycleOutcome::Updated(candidate))
            }
            Err(e) => {
                error!(
                    key = %key,
                    provider = self.updater.provider_name(),
                    error = %e,
                    "updating dyndns failed"
                );
                self.events.record(
                    key,
                    EventType::Warning,
                    reason::UPDATE_FAILED,
                    &e.to_string(),
                );
                Ok(CycleOutcome::Failed)
            }
        }
    }
}
