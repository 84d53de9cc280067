// # File Secret Store
//
// Reads credentials from a JSON document mapping `namespace/name` to the
// secret's entries:
//
// ```json
// {
//   "default/strato": { "password": "..." }
// }
// ```
//
// The file is read on every lookup, so a rotated secret is picked up by the
// next scheduled cycle without a restart. Secrets are not watched: a record
// that stopped on a missing credential stays stopped until its desired state
// changes (a reload with an edited record) or the daemon restarts.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::Error;
use crate::traits::{Secret, SecretStore};

/// File-based secret store
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    path: PathBuf,
}

impl FileSecretStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Secret>, Error> {
        let content = fs::read_to_string(&self.path).await.map_err(|e| {
            Error::secret(format!(
                "Failed to read secrets file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let mut secrets: HashMap<String, Secret> = serde_json::from_str(&content).map_err(|e| {
            Error::secret(format!(
                "Failed to parse secrets file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        Ok(secrets.remove(&format!("{}/{}", namespace, name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_lookup_by_namespace_and_name() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("secrets.json");
        fs::write(&path, r#"{ "default/strato": { "password": "pw" } }"#)
            .await
            .unwrap();

        let store = FileSecretStore::new(&path);
        let secret = store.get("default", "strato").await.unwrap().unwrap();
        assert_eq!(secret.password(), Some("pw"));

        assert!(store.get("other", "strato").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_is_reread() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("secrets.json");
        fs::write(&path, "{}").await.unwrap();

        let store = FileSecretStore::new(&path);
        assert!(store.get("default", "strato").await.unwrap().is_none());

        fs::write(&path, r#"{ "default/strato": { "password": "fixed" } }"#)
            .await
            .unwrap();
        let secret = store.get("default", "strato").await.unwrap().unwrap();
        assert_eq!(secret.password(), Some("fixed"));
    }

    #[tokio::test]
    async fn test_unreadable_file_is_an_error() {
        let dir = tempdir().unwrap();
        let store = FileSecretStore::new(dir.path().join("missing.json"));
        assert!(matches!(
            store.get("default", "strato").await,
            Err(Error::Secret(_))
        ));
    }
}
