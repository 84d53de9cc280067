// # File Record Store
//
// File-based implementation of RecordStore with crash recovery.
//
// ## Layout
//
// Two files are involved:
//
// - The **records file** is owned by the operator and only read here. It is
//   loaded at startup and again on `reload()` (the daemon calls it on SIGHUP).
// - The **status file** is owned by the engine. Every status write replaces
//   it atomically.
//
// Keeping them apart means a status write can never clobber an operator edit
// that has not been reloaded yet.
//
// ## Crash Recovery (status file)
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Corruption detection: Validates JSON on load
// - Automatic backup: Keeps .backup of last known good state
// - Recovery: Falls back to backup if corruption detected
//
// ## File Formats
//
// Records file:
//
// ```json
// {
//   "records": [
//     {
//       "namespace": "default",
//       "name": "home",
//       "spec": { "fqdn": "home.example.com", "interval": 5, "password": { "name": "strato" } }
//     }
//   ]
// }
// ```
//
// Status file:
//
// ```json
// {
//   "version": "1.0",
//   "statuses": {
//     "default/home": { "enabled": true, "ipAddress": "1.2.3.4", "mode": "Dynamic",
//                       "lastLoop": "2025-01-09T12:00:00Z", "lastResult": true }
//   }
// }
// ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};

use crate::Error;
use crate::model::{DesiredRecord, DomainRecord, ObservedState, RecordKey};
use crate::store::watch::WatchHub;
use crate::traits::{RecordStore, WatchStream};

/// Status file format version
/// Used for future migration if format changes
const STATUS_FILE_VERSION: &str = "1.0";

/// Operator-owned records file
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct RecordsFileFormat {
    #[serde(default)]
    records: Vec<RecordEntry>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct RecordEntry {
    #[serde(flatten)]
    key: RecordKey,
    spec: DesiredRecord,
}

/// Engine-owned status file
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct StatusFileFormat {
    version: String,
    statuses: HashMap<String, ObservedState>,
}

/// File-based record store
///
/// # Example
///
/// ```rust,no_run
/// use dyndns_core::store::FileRecordStore;
/// use dyndns_core::traits::RecordStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileRecordStore::new(
///         "/etc/dyndns/records.json",
///         "/var/lib/dyndns/status.json",
///     )
///     .await?;
///
///     for key in store.list_keys().await? {
///         println!("managing {}", key);
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileRecordStore {
    records_path: PathBuf,
    status_path: PathBuf,
    state: Arc<RwLock<HashMap<RecordKey, DomainRecord>>>,
    /// Serializes status file writes and the commits that follow them
    write_lock: Mutex<()>,
    watchers: WatchHub,
}

impl FileRecordStore {
    /// Load a file record store
    ///
    /// This will:
    /// 1. Load the records file (must exist)
    /// 2. Load the status file, recovering from its backup if corrupted
    /// 3. Create the status directory if needed
    pub async fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        records_path: P,
        status_path: Q,
    ) -> Result<Self, Error> {
        let records_path = records_path.as_ref().to_path_buf();
        let status_path = status_path.as_ref().to_path_buf();

        // Create parent directory if it doesn't exist
        if let Some(parent) = status_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::store(format!(
                        "Failed to create status directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let specs = Self::load_records(&records_path).await?;
        let mut statuses = Self::load_status_with_recovery(&status_path).await?;

        let records = specs
            .into_iter()
            .map(|(key, spec)| {
                let status = statuses.remove(&key.to_string()).unwrap_or_default();
                let record = DomainRecord { key: key.clone(), spec, status };
                (key, record)
            })
            .collect::<HashMap<_, _>>();

        tracing::debug!(
            "Loaded {} record(s) from {}",
            records.len(),
            records_path.display()
        );

        Ok(Self {
            records_path,
            status_path,
            state: Arc::new(RwLock::new(records)),
            write_lock: Mutex::new(()),
            watchers: WatchHub::new(),
        })
    }

    /// Re-read the records file and notify watchers of every change
    ///
    /// Status of unchanged and changed records is kept; status of removed
    /// records is dropped. The new record set is staged and only becomes
    /// visible once the status file has been written; on error the store
    /// keeps serving the previous records and nothing is notified.
    ///
    /// # Returns
    ///
    /// The keys that were added, changed or removed.
    pub async fn reload(&self) -> Result<Vec<RecordKey>, Error> {
        let specs = Self::load_records(&self.records_path).await?;

        let write_guard = self.write_lock.lock().await;

        let (next, mut changed) = {
            let guard = self.state.read().await;
            let mut changed: Vec<RecordKey> = guard
                .keys()
                .filter(|key| !specs.contains_key(*key))
                .cloned()
                .collect();

            let mut next = HashMap::with_capacity(specs.len());
            for (key, spec) in specs {
                let record = match guard.get(&key) {
                    Some(existing) if existing.spec == spec => existing.clone(),
                    Some(existing) => {
                        changed.push(key.clone());
                        DomainRecord {
                            spec,
                            ..existing.clone()
                        }
                    }
                    None => {
                        changed.push(key.clone());
                        DomainRecord::new(key.clone(), spec)
                    }
                };
                next.insert(key, record);
            }
            (next, changed)
        };

        if !changed.is_empty() {
            self.write_status(&Self::status_snapshot(&next)).await?;
            *self.state.write().await = next;
        }
        drop(write_guard);

        changed.sort();
        for key in &changed {
            self.watchers.notify(key);
        }

        tracing::info!(
            "Reloaded {}: {} record(s) changed",
            self.records_path.display(),
            changed.len()
        );
        Ok(changed)
    }

    /// Load and validate the records file
    ///
    /// Entries that fail validation are skipped with a warning so one bad
    /// record cannot take the others down.
    async fn load_records(path: &Path) -> Result<HashMap<RecordKey, DesiredRecord>, Error> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::store(format!(
                "Failed to read records file {}: {}",
                path.display(),
                e
            ))
        })?;

        let file: RecordsFileFormat = serde_json::from_str(&content).map_err(|e| {
            Error::store(format!(
                "Failed to parse records file {}: {}",
                path.display(),
                e
            ))
        })?;

        let mut records = HashMap::new();
        for entry in file.records {
            if let Err(e) = entry.spec.validate() {
                tracing::warn!("Skipping invalid record {}: {}", entry.key, e);
                continue;
            }
            if records.insert(entry.key.clone(), entry.spec).is_some() {
                tracing::warn!("Duplicate record {}, keeping the last entry", entry.key);
            }
        }

        Ok(records)
    }

    /// Load the status file with automatic recovery
    ///
    /// Recovery strategy:
    /// 1. Try to load main status file
    /// 2. If JSON parse error, try loading backup
    /// 3. If backup also fails, start with empty status
    async fn load_status_with_recovery(
        path: &Path,
    ) -> Result<HashMap<String, ObservedState>, Error> {
        match Self::load_status(path).await {
            Ok(statuses) => Ok(statuses),
            Err(Error::Json(e)) => {
                tracing::warn!(
                    "Status file appears corrupted: {}. Attempting recovery from backup.",
                    e
                );

                let backup_path = Self::backup_path(path);
                if !backup_path.exists() {
                    tracing::warn!("No backup file found. Starting with empty status.");
                    return Ok(HashMap::new());
                }

                match Self::load_status(&backup_path).await {
                    Ok(statuses) => {
                        tracing::info!("Recovered status from backup: {} records", statuses.len());

                        if let Err(restore_err) = fs::copy(&backup_path, path).await {
                            tracing::error!(
                                "Failed to restore status file from backup: {}",
                                restore_err
                            );
                        }

                        Ok(statuses)
                    }
                    Err(backup_err) => {
                        tracing::error!(
                            "Backup also corrupted: {}. Starting with empty status.",
                            backup_err
                        );
                        Ok(HashMap::new())
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Load the status file
    async fn load_status(path: &Path) -> Result<HashMap<String, ObservedState>, Error> {
        if !path.exists() {
            tracing::debug!("Status file does not exist: {}", path.display());
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::store(format!(
                "Failed to read status file {}: {}",
                path.display(),
                e
            ))
        })?;

        let status_file: StatusFileFormat = serde_json::from_str(&content)?;

        if status_file.version != STATUS_FILE_VERSION {
            tracing::warn!(
                "Status file version mismatch: expected {}, got {}. \
                Attempting to load anyway.",
                STATUS_FILE_VERSION,
                status_file.version
            );
        }

        Ok(status_file.statuses)
    }

    /// Build the status file contents for a record set
    fn status_snapshot(records: &HashMap<RecordKey, DomainRecord>) -> StatusFileFormat {
        StatusFileFormat {
            version: STATUS_FILE_VERSION.to_string(),
            statuses: records
                .values()
                .map(|record| (record.key.to_string(), record.status.clone()))
                .collect(),
        }
    }

    /// Write the status file atomically
    ///
    /// Callers hold `write_lock` and commit to `state` only after this
    /// returns `Ok`.
    async fn write_status(&self, status_file: &StatusFileFormat) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(status_file)
            .map_err(|e| Error::store(format!("Failed to serialize status: {}", e)))?;

        // Write to temporary file first
        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::store(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.flush().await.map_err(|e| {
                Error::store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        // Create backup of current file (if it exists)
        if self.status_path.exists() {
            let backup_path = Self::backup_path(&self.status_path);
            if let Err(e) = fs::copy(&self.status_path, &backup_path).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        // Atomic rename (temp -> actual)
        fs::rename(&temp_path, &self.status_path)
            .await
            .map_err(|e| {
                Error::store(format!(
                    "Failed to rename {} to {}: {}",
                    temp_path.display(),
                    self.status_path.display(),
                    e
                ))
            })?;

        tracing::trace!("Status written to file: {}", self.status_path.display());
        Ok(())
    }

    /// Get path to temporary file for atomic writes
    fn temp_path(&self) -> PathBuf {
        let mut temp = self.status_path.clone();
        temp.set_extension("tmp");
        temp
    }

    /// Get path to backup file
    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn get(&self, key: &RecordKey) -> Result<Option<DomainRecord>, Error> {
        let guard = self.state.read().await;
        Ok(guard.get(key).cloned())
    }

    async fn update_status(&self, key: &RecordKey, status: &ObservedState) -> Result<(), Error> {
        let _write_guard = self.write_lock.lock().await;

        let status_file = {
            let guard = self.state.read().await;
            if !guard.contains_key(key) {
                return Err(Error::not_found(key.to_string()));
            }
            let mut snapshot = Self::status_snapshot(&guard);
            snapshot.statuses.insert(key.to_string(), status.clone());
            snapshot
        };

        // Readers only see the new status once it is on disk
        self.write_status(&status_file).await?;

        let mut guard = self.state.write().await;
        if let Some(record) = guard.get_mut(key) {
            record.status = status.clone();
        }
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<RecordKey>, Error> {
        let guard = self.state.read().await;
        let mut keys: Vec<RecordKey> = guard.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    fn watch(&self) -> WatchStream {
        self.watchers.subscribe()
    }
}
