//! Configuration types for the reconciler
//!
//! This module defines all configuration structures used throughout the
//! workspace. The daemon fills them from environment variables; embedders can
//! build them directly or deserialize them.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default IP-echo endpoint (plain-text body with the caller's address)
pub const DEFAULT_IP_ECHO_URL: &str = "https://myexternalip.com/raw";

/// Default dyndns2 update endpoint
pub const DEFAULT_UPDATE_URL: &str = "https://dyndns.strato.com/nic/update";

/// Main controller configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// IP-echo service settings
    #[serde(default)]
    pub ip_echo: IpEchoConfig,

    /// DNS provider settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Record store settings
    #[serde(default)]
    pub record_store: RecordStoreConfig,

    /// Secret store settings
    #[serde(default)]
    pub secret_store: SecretStoreConfig,

    /// Dispatcher settings
    #[serde(default)]
    pub controller: WorkerConfig,
}

impl ControllerConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.ip_echo.validate()?;
        self.provider.validate()?;
        self.record_store.validate()?;
        self.secret_store.validate()?;
        self.controller.validate()?;
        Ok(())
    }
}

/// Address family accepted from the IP-echo service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpVersion {
    /// IPv4 only
    V4,
    /// IPv6 only
    V6,
    /// Both IPv4 and IPv6
    #[default]
    Both,
}

/// IP-echo service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpEchoConfig {
    /// URL returning the caller's address as plain text
    #[serde(default = "default_ip_echo_url")]
    pub url: String,

    /// Request timeout (in seconds)
    #[serde(default = "default_ip_echo_timeout_secs")]
    pub timeout_secs: u64,

    /// Accepted address family
    #[serde(default)]
    pub version: IpVersion,
}

impl IpEchoConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), crate::Error> {
        validate_http_url("IP-echo URL", &self.url)?;
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("IP-echo timeout must be > 0"));
        }
        Ok(())
    }
}

impl Default for IpEchoConfig {
    fn default() -> Self {
        Self {
            url: default_ip_echo_url(),
            timeout_secs: default_ip_echo_timeout_secs(),
            version: IpVersion::default(),
        }
    }
}

/// DNS provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// dyndns2 update endpoint
    #[serde(default = "default_update_url")]
    pub update_url: String,

    /// Request timeout (in seconds)
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,

    /// Log the update instead of sending it
    #[serde(default)]
    pub dry_run: bool,
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), crate::Error> {
        validate_http_url("update URL", &self.update_url)?;
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("provider timeout must be > 0"));
        }
        Ok(())
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            update_url: default_update_url(),
            timeout_secs: default_provider_timeout_secs(),
            dry_run: false,
        }
    }
}

/// Record store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordStoreConfig {
    /// Records file plus engine-owned status file
    File {
        /// Operator-owned records file
        records_path: String,
        /// Engine-owned status file
        status_path: String,
    },

    /// In-memory store (not persistent)
    #[default]
    Memory,
}

impl RecordStoreConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if let RecordStoreConfig::File {
            records_path,
            status_path,
        } = self
        {
            if records_path.is_empty() {
                return Err(crate::Error::config("records path cannot be empty"));
            }
            if status_path.is_empty() {
                return Err(crate::Error::config("status path cannot be empty"));
            }
            if records_path == status_path {
                return Err(crate::Error::config(
                    "records path and status path must differ",
                ));
            }
        }
        Ok(())
    }
}

/// Secret store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SecretStoreConfig {
    /// JSON secrets file, re-read on each lookup
    File {
        /// Path to the secrets file
        path: String,
    },

    /// In-memory store
    #[default]
    Memory,
}

impl SecretStoreConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if let SecretStoreConfig::File { path } = self {
            if path.is_empty() {
                return Err(crate::Error::config("secrets path cannot be empty"));
            }
        }
        Ok(())
    }
}

/// Dispatcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Number of concurrent workers (distinct records only)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Fixed delay before retrying a failed status write (in seconds)
    #[serde(default = "default_status_retry_secs")]
    pub status_retry_secs: u64,

    /// First backoff step for other propagated errors (in milliseconds)
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Backoff cap (in seconds)
    #[serde(default = "default_backoff_max_secs")]
    pub backoff_max_secs: u64,

    /// Upper bound for a single cycle (in seconds)
    #[serde(default = "default_cycle_timeout_secs")]
    pub cycle_timeout_secs: u64,

    /// Capacity of the event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl WorkerConfig {
    pub fn status_retry(&self) -> Duration {
        Duration::from_secs(self.status_retry_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_secs(self.backoff_max_secs)
    }

    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_secs(self.cycle_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.workers == 0 {
            return Err(crate::Error::config("workers must be > 0"));
        }
        if self.status_retry_secs == 0 {
            return Err(crate::Error::config("status retry delay must be > 0"));
        }
        if self.backoff_base_ms == 0 {
            return Err(crate::Error::config("backoff base must be > 0"));
        }
        if self.backoff_base() > self.backoff_max() {
            return Err(crate::Error::config("backoff base cannot exceed backoff max"));
        }
        if self.cycle_timeout_secs == 0 {
            return Err(crate::Error::config("cycle timeout must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            status_retry_secs: default_status_retry_secs(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_secs: default_backoff_max_secs(),
            cycle_timeout_secs: default_cycle_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn validate_http_url(what: &str, url: &str) -> Result<(), crate::Error> {
    if url.is_empty() {
        return Err(crate::Error::config(format!("{} cannot be empty", what)));
    }
    if !url.starts_with("https://") && !url.starts_with("http://") {
        return Err(crate::Error::config(format!(
            "{} must use HTTP or HTTPS scheme. Got: {}",
            what, url
        )));
    }
    Ok(())
}

fn default_ip_echo_url() -> String {
    DEFAULT_IP_ECHO_URL.to_string()
}

fn default_ip_echo_timeout_secs() -> u64 {
    10
}

fn default_update_url() -> String {
    DEFAULT_UPDATE_URL.to_string()
}

fn default_provider_timeout_secs() -> u64 {
    30
}

fn default_workers() -> usize {
    4
}

fn default_status_retry_secs() -> u64 {
    15
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_backoff_max_secs() -> u64 {
    300
}

fn default_cycle_timeout_secs() -> u64 {
    120
}

fn default_event_channel_capacity() -> usize {
    1000
}
