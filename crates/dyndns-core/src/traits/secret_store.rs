// # Secret Store Trait
//
// Read-only access to pre-provisioned secrets. The engine only ever reads the
// `password` entry of the secret a record references.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;

/// Key of the secret entry holding the update password
pub const PASSWORD_KEY: &str = "password";

/// A resolved secret
///
/// The Debug implementation lists entry names only, never values.
#[derive(Clone, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(transparent)]
pub struct Secret {
    data: HashMap<String, String>,
}

impl Secret {
    pub fn new(data: HashMap<String, String>) -> Self {
        Self { data }
    }

    /// Convenience constructor for a secret holding only a password
    pub fn with_password(password: impl Into<String>) -> Self {
        let mut data = HashMap::new();
        data.insert(PASSWORD_KEY.to_string(), password.into());
        Self { data }
    }

    /// Look up an entry
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    /// The update password, if present
    pub fn password(&self) -> Option<&str> {
        self.get(PASSWORD_KEY)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.data.keys().collect();
        keys.sort();
        f.debug_struct("Secret")
            .field("keys", &keys)
            .finish()
    }
}

/// Trait for secret store implementations
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Resolve a secret
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Secret))`: The secret exists
    /// - `Ok(None)`: No such secret
    /// - `Err(Error)`: The store could not be read
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Secret>, crate::Error>;
}
