// # Watch fan-out
//
// Shared by the record stores: every subscriber gets its own broadcast
// receiver wrapped as a stream of changed keys.

use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use crate::model::RecordKey;
use crate::traits::WatchStream;

/// Capacity of the per-subscriber notification buffer
const WATCH_CHANNEL_CAPACITY: usize = 1024;

/// Broadcasts desired-state changes to all watchers
#[derive(Debug, Clone)]
pub(crate) struct WatchHub {
    tx: broadcast::Sender<RecordKey>,
}

impl WatchHub {
    pub(crate) fn new() -> Self {
        let (tx, _) = broadcast::channel(WATCH_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Notify watchers that `key` changed
    pub(crate) fn notify(&self, key: &RecordKey) {
        // No receivers is fine: nobody is watching yet
        let _ = self.tx.send(key.clone());
    }

    pub(crate) fn subscribe(&self) -> WatchStream {
        let stream = BroadcastStream::new(self.tx.subscribe()).filter_map(|item| match item {
            Ok(key) => Some(key),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!("Watcher lagged behind, {} change notifications dropped", skipped);
                None
            }
        });

        Box::pin(stream)
    }
}
