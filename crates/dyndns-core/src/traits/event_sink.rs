// # Event Sink Trait
//
// Fire-and-forget channel for operator-facing events (the equivalent of
// resource events in a cluster). Recording an event must never fail a cycle.

use std::fmt;

use crate::model::RecordKey;

/// Severity of a recorded event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Normal,
    Warning,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Normal => f.write_str("Normal"),
            EventType::Warning => f.write_str("Warning"),
        }
    }
}

/// Event reasons recorded by the engine
pub mod reason {
    pub const RETRIEVE_EXTERNAL_IP_FAILED: &str = "RetrieveExternalIpFailed";
    pub const UPDATE_SKIPPED: &str = "DynDnsUpdateSkipped";
    pub const UPDATE_COMPLETED: &str = "DynDnsUpdateCompleted";
    pub const UPDATE_FAILED: &str = "DynDnsUpdateFailed";
}

/// A recorded event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordEvent {
    pub key: RecordKey,
    pub event_type: EventType,
    pub reason: String,
    pub message: String,
}

/// Trait for event sink implementations
pub trait EventSink: Send + Sync {
    /// Record an event for `key`
    fn record(&self, key: &RecordKey, event_type: EventType, reason: &str, message: &str);
}
