// # dyndns-core
//
// Core library for the dyndns reconciliation controller.
//
// ## Architecture Overview
//
// This library decides, per domain record, whether and when to push the
// current public address to a dyndns provider:
// - **RecordStore**: Desired records, observed status, change notifications
// - **SecretStore**: Credential lookup for the update call
// - **IpResolver**: Public address discovery for dynamic records
// - **DnsUpdater**: The remote dyndns2 update call
// - **EventSink**: Operator-facing events
// - **Reconciler**: One stateless cycle for one record
// - **Controller**: Work queue and workers that drive the reconciler
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Decisions are pure functions; I/O lives
//    behind traits
// 2. **Event-Driven**: Record changes arrive as an async stream of keys
// 3. **Library-First**: All core functionality can be used as a library
// 4. **Idempotency**: Status is the only memory between cycles; the update
//    call is skipped when the observed address already matches

pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod events;
pub mod model;
pub mod store;
pub mod traits;

// Re-export core types for convenience
pub use config::{
    ControllerConfig, IpEchoConfig, IpVersion, ProviderConfig, RecordStoreConfig,
    SecretStoreConfig, WorkerConfig,
};
pub use controller::{Controller, WorkQueue};
pub use engine::{Action, CycleOutcome, Gate, Reconciler};
pub use error::{Error, Result};
pub use events::{ChannelEventSink, TracingEventSink};
pub use model::{CredentialRef, DesiredRecord, DomainRecord, Mode, ObservedState, RecordKey};
pub use store::{FileRecordStore, FileSecretStore, MemoryRecordStore, MemorySecretStore};
pub use traits::{
    DnsUpdater, EventSink, EventType, IpResolver, RecordEvent, RecordStore, Secret, SecretStore,
    UpdateOutcome, UpdateRequest,
};
