// # Memory Stores
//
// In-memory implementations of RecordStore and SecretStore.
//
// ## Purpose
//
// Provides simple, fast stores that don't persist across restarts. Useful for
// testing and for embedding the engine in a process that owns its records.
//
// ## Crash Behavior
//
// - All records and status are lost on restart
// - The first cycle after a restart treats every record as never run and
//   pushes its address once more (harmless: the provider answers `nochg`)

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::model::{DesiredRecord, DomainRecord, ObservedState, RecordKey};
use crate::store::watch::WatchHub;
use crate::traits::{RecordStore, Secret, SecretStore, WatchStream};

/// In-memory record store
///
/// Records live in a HashMap protected by a RwLock. Desired-state changes made
/// through [`MemoryRecordStore::apply`] and [`MemoryRecordStore::delete`] are
/// broadcast to watchers; status writes are not.
///
/// # Example
///
/// ```rust,no_run
/// use dyndns_core::model::{CredentialRef, DesiredRecord, RecordKey};
/// use dyndns_core::store::MemoryRecordStore;
/// use dyndns_core::traits::RecordStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryRecordStore::new();
///     let key = RecordKey::new("default", "home");
///
///     store
///         .apply(&key, DesiredRecord::new("home.example.com", CredentialRef::new("strato")))
///         .await?;
///
///     let record = store.get(&key).await?;
///     assert!(record.is_some());
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryRecordStore {
    inner: Arc<RwLock<HashMap<RecordKey, DomainRecord>>>,
    watchers: WatchHub,
}

impl MemoryRecordStore {
    /// Create a new empty memory record store
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            watchers: WatchHub::new(),
        }
    }

    /// Create or update the desired state of a record
    ///
    /// The existing status is kept. Watchers are notified when the record is
    /// new or its desired state actually changed.
    pub async fn apply(&self, key: &RecordKey, spec: DesiredRecord) -> Result<(), Error> {
        spec.validate()?;

        let changed = {
            let mut guard = self.inner.write().await;
            match guard.get_mut(key) {
                Some(existing) if existing.spec == spec => false,
                Some(existing) => {
                    existing.spec = spec;
                    true
                }
                None => {
                    guard.insert(key.clone(), DomainRecord::new(key.clone(), spec));
                    true
                }
            }
        };

        if changed {
            self.watchers.notify(key);
        }
        Ok(())
    }

    /// Insert a record together with a pre-existing status
    pub async fn insert(&self, record: DomainRecord) -> Result<(), Error> {
        record.spec.validate()?;

        let key = record.key.clone();
        self.inner.write().await.insert(key.clone(), record);
        self.watchers.notify(&key);
        Ok(())
    }

    /// Delete a record and its status
    pub async fn delete(&self, key: &RecordKey) -> Result<(), Error> {
        let removed = self.inner.write().await.remove(key).is_some();
        if removed {
            self.watchers.notify(key);
        }
        Ok(())
    }

    /// Get the number of records in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get(&self, key: &RecordKey) -> Result<Option<DomainRecord>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.get(key).cloned())
    }

    async fn update_status(&self, key: &RecordKey, status: &ObservedState) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        let record = guard
            .get_mut(key)
            .ok_or_else(|| Error::not_found(key.to_string()))?;
        record.status = status.clone();
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<RecordKey>, Error> {
        let guard = self.inner.read().await;
        let mut keys: Vec<RecordKey> = guard.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    fn watch(&self) -> WatchStream {
        self.watchers.subscribe()
    }
}

/// In-memory secret store
#[derive(Debug, Clone, Default)]
pub struct MemorySecretStore {
    inner: Arc<RwLock<HashMap<(String, String), Secret>>>,
}

impl MemorySecretStore {
    /// Create a new empty memory secret store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a secret
    pub async fn insert(&self, namespace: impl Into<String>, name: impl Into<String>, secret: Secret) {
        self.inner
            .write()
            .await
            .insert((namespace.into(), name.into()), secret);
    }

    /// Remove a secret
    pub async fn remove(&self, namespace: &str, name: &str) {
        self.inner
            .write()
            .await
            .remove(&(namespace.to_string(), name.to_string()));
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Secret>, Error> {
        let guard = self.inner.read().await;
        Ok(guard
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }
}
