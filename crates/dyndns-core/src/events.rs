//! Event sink implementations
//!
//! - [`TracingEventSink`]: writes events to the log
//! - [`ChannelEventSink`]: forwards events to a bounded channel for external
//!   monitoring

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::model::RecordKey;
use crate::traits::{EventSink, EventType, RecordEvent};

/// Event sink that logs every event
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn record(&self, key: &RecordKey, event_type: EventType, reason: &str, message: &str) {
        match event_type {
            EventType::Normal => info!(key = %key, reason, "{}", message),
            EventType::Warning => warn!(key = %key, reason, "{}", message),
        }
    }
}

/// Event sink backed by a bounded channel
///
/// Recording never blocks a cycle: when the channel is full the event is
/// dropped with a warning.
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    tx: mpsc::Sender<RecordEvent>,
}

impl ChannelEventSink {
    /// Create a sink and the receiver its events are delivered to
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<RecordEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelEventSink {
    fn record(&self, key: &RecordKey, event_type: EventType, reason: &str, message: &str) {
        let event = RecordEvent {
            key: key.clone(),
            event_type,
            reason: reason.to_string(),
            message: message.to_string(),
        };

        if self.tx.try_send(event).is_err() {
            warn!(
                key = %key,
                reason,
                "Event channel full or closed, dropping event. Consider increasing event_channel_capacity."
            );
        }
    }
}
