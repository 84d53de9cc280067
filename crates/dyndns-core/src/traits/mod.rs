//! Collaborator traits for the reconciler
//!
//! This module defines the narrow interfaces the engine consumes.
//!
//! - [`RecordStore`]: Desired records and their observed state
//! - [`SecretStore`]: Credential lookup
//! - [`IpResolver`]: Public IP detection
//! - [`DnsUpdater`]: Remote DNS update call
//! - [`EventSink`]: Operator-facing events

pub mod record_store;
pub mod secret_store;
pub mod ip_resolver;
pub mod dns_updater;
pub mod event_sink;

pub use record_store::{RecordStore, WatchStream};
pub use secret_store::{Secret, SecretStore, PASSWORD_KEY};
pub use ip_resolver::IpResolver;
pub use dns_updater::{DnsUpdater, UpdateOutcome, UpdateRequest};
pub use event_sink::{EventSink, EventType, RecordEvent, reason};
