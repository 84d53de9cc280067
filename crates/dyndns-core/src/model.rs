//! Record model
//!
//! A managed hostname is described by a [`DomainRecord`]: the operator-owned
//! [`DesiredRecord`] plus the engine-owned [`ObservedState`]. The serialized
//! field names follow the `Domain` resource layout (`spec` / `status`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use crate::error::{Error, Result};

/// Lower bound (and default) for `intervalMinutes`
pub const MIN_INTERVAL_MINUTES: u32 = 5;

/// Identity of a record inside the record store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey {
    pub namespace: String,
    pub name: String,
}

impl RecordKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Parse a `namespace/name` string
    pub fn parse(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((namespace, name)) if !namespace.is_empty() && !name.is_empty() => {
                Ok(Self::new(namespace, name))
            }
            _ => Err(Error::invalid_input(format!(
                "record key must be 'namespace/name', got '{}'",
                s
            ))),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// IP resolution mode of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// The IP address is given explicitly in the desired state
    Manual,
    /// The IP address is detected through the IP-echo service
    Dynamic,
}

impl Mode {
    /// Display label stored in the observed state
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Manual => "Manual",
            Mode::Dynamic => "Dynamic",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to the secret holding the update password
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRef {
    /// Secret name
    pub name: String,
    /// Secret namespace; the record's namespace when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl CredentialRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
        }
    }

    /// Namespace the secret is looked up in for a record under `key`
    pub fn namespace_for<'a>(&'a self, key: &'a RecordKey) -> &'a str {
        self.namespace.as_deref().unwrap_or(&key.namespace)
    }
}

/// Desired state of one DNS hostname
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesiredRecord {
    /// Hostname to keep updated
    pub fqdn: String,

    /// Explicit IPv4 address; forces manual mode
    #[serde(default, rename = "ipAddress", skip_serializing_if = "Option::is_none")]
    pub static_ip: Option<Ipv4Addr>,

    /// Whether the record is reconciled at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Minutes between dynamic-mode evaluations
    #[serde(default = "default_interval_minutes", rename = "interval")]
    pub interval_minutes: u32,

    /// Secret holding the update password
    #[serde(rename = "password")]
    pub credential_ref: CredentialRef,
}

fn default_enabled() -> bool {
    true
}

fn default_interval_minutes() -> u32 {
    MIN_INTERVAL_MINUTES
}

impl DesiredRecord {
    /// Create an enabled, dynamic-mode record with the default interval
    pub fn new(fqdn: impl Into<String>, credential_ref: CredentialRef) -> Self {
        Self {
            fqdn: fqdn.into(),
            static_ip: None,
            enabled: true,
            interval_minutes: MIN_INTERVAL_MINUTES,
            credential_ref,
        }
    }

    /// Pin the record to an explicit address
    pub fn with_static_ip(mut self, ip: Ipv4Addr) -> Self {
        self.static_ip = Some(ip);
        self
    }

    /// Enable or disable the record
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the evaluation interval
    pub fn with_interval_minutes(mut self, minutes: u32) -> Self {
        self.interval_minutes = minutes;
        self
    }

    /// Validate the record at the store boundary
    pub fn validate(&self) -> Result<()> {
        validate_fqdn(&self.fqdn)?;

        if self.interval_minutes < MIN_INTERVAL_MINUTES {
            return Err(Error::invalid_input(format!(
                "interval must be at least {} minutes, got {}",
                MIN_INTERVAL_MINUTES, self.interval_minutes
            )));
        }

        if self.credential_ref.name.is_empty() {
            return Err(Error::invalid_input("password secret name cannot be empty"));
        }

        Ok(())
    }
}

/// Validate a hostname: dot-separated labels of ASCII letters, digits and
/// inner hyphens, each 1 to 63 characters long
pub fn validate_fqdn(fqdn: &str) -> Result<()> {
    if fqdn.is_empty() {
        return Err(Error::invalid_input("fqdn cannot be empty"));
    }

    if fqdn.len() > 253 {
        return Err(Error::invalid_input(format!(
            "fqdn too long: {} chars (max 253)",
            fqdn.len()
        )));
    }

    for label in fqdn.split('.') {
        if label.is_empty() || label.len() > 63 {
            return Err(Error::invalid_input(format!(
                "invalid label length in fqdn '{}'",
                fqdn
            )));
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(Error::invalid_input(format!(
                "fqdn label '{}' contains invalid characters",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::invalid_input(format!(
                "fqdn label '{}' cannot start or end with a hyphen",
                label
            )));
        }
    }

    Ok(())
}

/// Observed state of one record, written only by the engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservedState {
    /// Mirror of the desired `enabled` flag
    #[serde(default)]
    pub enabled: bool,

    /// Last address successfully applied to the DNS record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<IpAddr>,

    /// Mode of the last executed cycle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,

    /// Time of the last executed cycle
    #[serde(default, rename = "lastLoop", skip_serializing_if = "Option::is_none")]
    pub last_reconciliation_loop: Option<DateTime<Utc>>,

    /// Outcome of the last executed cycle
    #[serde(default, rename = "lastResult", skip_serializing_if = "Option::is_none")]
    pub last_reconciliation_result: Option<bool>,
}

impl ObservedState {
    /// Whether the last executed cycle completed successfully
    ///
    /// A record that never ran counts as unsuccessful.
    pub fn was_successful(&self) -> bool {
        self.last_reconciliation_result == Some(true)
    }
}

/// A record as handed out by the record store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRecord {
    #[serde(flatten)]
    pub key: RecordKey,
    pub spec: DesiredRecord,
    #[serde(default)]
    pub status: ObservedState,
}

impl DomainRecord {
    /// Create a record that has never been reconciled
    pub fn new(key: RecordKey, spec: DesiredRecord) -> Self {
        Self {
            key,
            spec,
            status: ObservedState::default(),
        }
    }
}
