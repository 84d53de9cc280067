// # Store Implementations
//
// This module provides implementations of the RecordStore and SecretStore
// traits for different persistence strategies.

pub mod file;
pub mod memory;
pub mod secrets;
mod watch;

pub use file::FileRecordStore;
pub use memory::{MemoryRecordStore, MemorySecretStore};
pub use secrets::FileSecretStore;
