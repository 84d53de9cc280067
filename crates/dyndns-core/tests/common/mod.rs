//! Test doubles and common utilities for reconciler contract tests
//!
//! This module provides minimal test doubles that record how the reconciler
//! uses its collaborators without talking to any real service.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use dyndns_core::error::{Error, Result};
use dyndns_core::model::{CredentialRef, DesiredRecord, DomainRecord, ObservedState, RecordKey};
use dyndns_core::traits::{
    DnsUpdater, IpResolver, RecordEvent, RecordStore, Secret, UpdateOutcome, UpdateRequest,
    WatchStream,
};
use dyndns_core::{ChannelEventSink, MemoryRecordStore, MemorySecretStore, Reconciler};
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// An IpResolver returning a configurable address (or failure)
pub struct MockIpResolver {
    /// Address to return; `None` makes resolve() fail
    ip: Mutex<Option<IpAddr>>,
    /// Call counter for resolve()
    resolve_call_count: AtomicUsize,
}

impl MockIpResolver {
    pub fn new(ip: IpAddr) -> Self {
        Self {
            ip: Mutex::new(Some(ip)),
            resolve_call_count: AtomicUsize::new(0),
        }
    }

    /// Change the address returned by the next resolve()
    pub fn set_ip(&self, ip: IpAddr) {
        *self.ip.lock().unwrap() = Some(ip);
    }

    /// Make every following resolve() fail
    pub fn fail(&self) {
        *self.ip.lock().unwrap() = None;
    }

    /// Get the number of times resolve() was called
    pub fn resolve_call_count(&self) -> usize {
        self.resolve_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpResolver for MockIpResolver {
    async fn resolve(&self) -> Result<IpAddr> {
        self.resolve_call_count.fetch_add(1, Ordering::SeqCst);
        self.ip
            .lock()
            .unwrap()
            .ok_or_else(|| Error::ip_resolution("connection refused"))
    }

    fn resolver_name(&self) -> &'static str {
        "mock"
    }
}

/// A recorded update call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpdate {
    pub hostname: String,
    pub username: String,
    pub password: String,
    pub ip: IpAddr,
}

/// A DnsUpdater that records calls and answers with a configurable body
pub struct MockDnsUpdater {
    /// Raw provider answer; `Err` carries the body of a rejection
    response: Mutex<std::result::Result<UpdateOutcome, String>>,
    /// Recorded calls
    calls: Mutex<Vec<RecordedUpdate>>,
    /// Call counter for update()
    update_call_count: AtomicUsize,
}

impl MockDnsUpdater {
    pub fn new() -> Self {
        Self {
            response: Mutex::new(Ok(UpdateOutcome::Good)),
            calls: Mutex::new(Vec::new()),
            update_call_count: AtomicUsize::new(0),
        }
    }

    /// Answer every following call with `outcome`
    pub fn respond_with(&self, outcome: UpdateOutcome) {
        *self.response.lock().unwrap() = Ok(outcome);
    }

    /// Reject every following call with `body`
    pub fn reject_with(&self, body: &str) {
        *self.response.lock().unwrap() = Err(body.to_string());
    }

    /// Get the number of times update() was called
    pub fn update_call_count(&self) -> usize {
        self.update_call_count.load(Ordering::SeqCst)
    }

    /// Get the recorded calls
    pub fn calls(&self) -> Vec<RecordedUpdate> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DnsUpdater for MockDnsUpdater {
    async fn update(&self, request: &UpdateRequest<'_>) -> Result<UpdateOutcome> {
        self.update_call_count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(RecordedUpdate {
            hostname: request.hostname.to_string(),
            username: request.username.to_string(),
            password: request.password.to_string(),
            ip: request.ip,
        });

        self.response.lock().unwrap().clone().map_err(Error::update)
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// A RecordStore wrapper whose status writes can be made to fail
pub struct FlakyStatusStore {
    inner: MemoryRecordStore,
    fail_status_writes: AtomicBool,
    update_status_call_count: AtomicUsize,
}

impl FlakyStatusStore {
    pub fn new(inner: MemoryRecordStore) -> Self {
        Self {
            inner,
            fail_status_writes: AtomicBool::new(false),
            update_status_call_count: AtomicUsize::new(0),
        }
    }

    pub fn fail_status_writes(&self, fail: bool) {
        self.fail_status_writes.store(fail, Ordering::SeqCst);
    }

    /// Get the number of times update_status() was called
    pub fn update_status_call_count(&self) -> usize {
        self.update_status_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RecordStore for FlakyStatusStore {
    async fn get(&self, key: &RecordKey) -> Result<Option<DomainRecord>> {
        self.inner.get(key).await
    }

    async fn update_status(&self, key: &RecordKey, status: &ObservedState) -> Result<()> {
        self.update_status_call_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_status_writes.load(Ordering::SeqCst) {
            return Err(Error::store("status write rejected"));
        }
        self.inner.update_status(key, status).await
    }

    async fn list_keys(&self) -> Result<Vec<RecordKey>> {
        self.inner.list_keys().await
    }

    fn watch(&self) -> WatchStream {
        self.inner.watch()
    }
}

/// Reconciler wired to in-memory stores and mocks
pub struct Fixture {
    pub records: MemoryRecordStore,
    pub store: Arc<FlakyStatusStore>,
    pub secrets: MemorySecretStore,
    pub resolver: Arc<MockIpResolver>,
    pub updater: Arc<MockDnsUpdater>,
    pub events: mpsc::Receiver<RecordEvent>,
    pub reconciler: Arc<Reconciler>,
}

impl Fixture {
    /// Build a fixture whose resolver reports `public_ip` and whose
    /// `default/strato` secret holds a password
    pub async fn new(public_ip: &str) -> Self {
        let records = MemoryRecordStore::new();
        let store = Arc::new(FlakyStatusStore::new(records.clone()));
        let secrets = MemorySecretStore::new();
        secrets
            .insert("default", "strato", Secret::with_password("s3cret"))
            .await;

        let resolver = Arc::new(MockIpResolver::new(ip(public_ip)));
        let updater = Arc::new(MockDnsUpdater::new());
        let (sink, events) = ChannelEventSink::new(100);

        let reconciler = Arc::new(Reconciler::new(
            store.clone(),
            Arc::new(secrets.clone()),
            resolver.clone(),
            updater.clone(),
            Arc::new(sink),
        ));

        Self {
            records,
            store,
            secrets,
            resolver,
            updater,
            events,
            reconciler,
        }
    }

    /// Insert a record with an existing status
    pub async fn seed(&self, spec: DesiredRecord, status: ObservedState) {
        let mut record = DomainRecord::new(key(), spec);
        record.status = status;
        self.records.insert(record).await.unwrap();
    }

    /// Current status of the default record
    pub async fn status(&self) -> ObservedState {
        self.records.get(&key()).await.unwrap().unwrap().status
    }

    /// Reasons of every event recorded so far
    pub fn event_reasons(&mut self) -> Vec<String> {
        let mut reasons = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            reasons.push(event.reason);
        }
        reasons
    }
}

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

/// Key of the record used by most tests
pub fn key() -> RecordKey {
    RecordKey::new("default", "home")
}

/// A fixed point in time
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub fn minutes_ago(minutes: i64) -> DateTime<Utc> {
    now() - chrono::Duration::minutes(minutes)
}

pub fn dynamic_spec() -> DesiredRecord {
    DesiredRecord::new("home.example.com", CredentialRef::new("strato"))
}

pub fn manual_spec(static_ip: &str) -> DesiredRecord {
    dynamic_spec().with_static_ip(static_ip.parse().unwrap())
}

/// Status left behind by an earlier cycle
pub fn prior_status(ip_address: &str, result: bool, loop_at: DateTime<Utc>) -> ObservedState {
    ObservedState {
        enabled: true,
        ip_address: Some(ip(ip_address)),
        mode: None,
        last_reconciliation_loop: Some(loop_at),
        last_reconciliation_result: Some(result),
    }
}
