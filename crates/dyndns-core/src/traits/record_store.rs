// # Record Store Trait
//
// Defines the interface to the declarative store holding desired records and
// their observed state.
//
// ## Purpose
//
// The engine reads a fresh (spec, status) pair at the start of every cycle and
// writes the new status back exactly once at the end. It never caches records
// between cycles, so the store is the single source of truth.
//
// ## Implementations
//
// - In-memory: `MemoryRecordStore` (tests, embedding)
// - File-based: `FileRecordStore` (daemon)
//
// ## Usage
//
// ```rust,ignore
// use dyndns_core::{RecordKey, RecordStore};
//
// let key = RecordKey::new("default", "home");
// if let Some(record) = store.get(&key).await? {
//     let mut status = record.status.clone();
//     status.enabled = record.spec.enabled;
//     store.update_status(&key, &status).await?;
// }
// ```

use async_trait::async_trait;
use std::pin::Pin;
use tokio_stream::Stream;

use crate::model::{DomainRecord, ObservedState, RecordKey};

/// Stream of keys whose desired state changed
pub type WatchStream = Pin<Box<dyn Stream<Item = RecordKey> + Send + 'static>>;

/// Trait for record store implementations
///
/// Implementations must be thread-safe: the dispatcher calls them from
/// several workers at once, although never for the same key concurrently.
///
/// # Watch semantics
///
/// `watch()` yields a key whenever its desired state is created, changed or
/// deleted. Status writes made through `update_status()` must NOT produce a
/// notification; otherwise every cycle would schedule the next one.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch a record
    ///
    /// # Returns
    ///
    /// - `Ok(Some(DomainRecord))`: The record with its current status
    /// - `Ok(None)`: The record does not exist (deleted in the meantime)
    /// - `Err(Error)`: Storage error
    async fn get(&self, key: &RecordKey) -> Result<Option<DomainRecord>, crate::Error>;

    /// Replace the observed state of a record
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Status persisted
    /// - `Err(Error)`: The record vanished or the write failed
    async fn update_status(
        &self,
        key: &RecordKey,
        status: &ObservedState,
    ) -> Result<(), crate::Error>;

    /// List the keys of all records in the store
    async fn list_keys(&self) -> Result<Vec<RecordKey>, crate::Error>;

    /// Watch for desired-state changes
    ///
    /// Each call returns an independent stream. Dropping the stream
    /// unsubscribes.
    fn watch(&self) -> WatchStream;
}
