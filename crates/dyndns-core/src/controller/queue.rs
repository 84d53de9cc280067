//! Per-key work queue
//!
//! Guarantees that a key is handed to at most one worker at a time:
//!
//! - A key that is already queued is not queued twice
//! - A key added while it is being processed is queued again once the
//!   worker calls [`WorkQueue::done`]
//! - Delayed adds keep the earliest deadline per key
//! - Propagated errors back off exponentially per key until
//!   [`WorkQueue::forget`] is called

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::model::RecordKey;

#[derive(Debug, Default)]
struct QueueState {
    ready: VecDeque<RecordKey>,
    queued: HashSet<RecordKey>,
    processing: HashSet<RecordKey>,
    dirty: HashSet<RecordKey>,
    delayed: HashMap<RecordKey, Instant>,
    failures: HashMap<RecordKey, u32>,
    shutdown: bool,
}

impl QueueState {
    /// Queue `key` now, or mark it for requeue if a worker holds it
    fn enqueue(&mut self, key: RecordKey) {
        if self.processing.contains(&key) {
            self.dirty.insert(key);
        } else if self.queued.insert(key.clone()) {
            self.ready.push_back(key);
        }
    }

    /// Move every delayed key whose deadline passed into the ready queue
    fn promote_due(&mut self, now: Instant) {
        let due: Vec<RecordKey> = self
            .delayed
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();

        for key in due {
            self.delayed.remove(&key);
            self.enqueue(key);
        }
    }
}

/// Work queue shared by the controller's workers
#[derive(Debug)]
pub struct WorkQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    backoff_base: Duration,
    backoff_max: Duration,
}

impl WorkQueue {
    /// Create a queue with the given per-key backoff bounds
    pub fn new(backoff_base: Duration, backoff_max: Duration) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            backoff_base,
            backoff_max,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
        // A poisoned lock only means a worker panicked mid-update; the
        // bookkeeping sets stay structurally valid
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue a key for immediate processing
    pub fn add(&self, key: RecordKey) {
        {
            let mut state = self.lock();
            if state.shutdown {
                return;
            }
            state.enqueue(key);
        }
        self.notify.notify_one();
    }

    /// Queue a key once `delay` has elapsed
    pub fn add_after(&self, key: RecordKey, delay: Duration) {
        if delay.is_zero() {
            self.add(key);
            return;
        }

        {
            let mut state = self.lock();
            if state.shutdown {
                return;
            }
            let deadline = Instant::now() + delay;
            state
                .delayed
                .entry(key)
                .and_modify(|existing| *existing = (*existing).min(deadline))
                .or_insert(deadline);
        }
        self.notify.notify_one();
    }

    /// Queue a key after its next backoff step
    ///
    /// # Returns
    ///
    /// The delay that was applied.
    pub fn add_rate_limited(&self, key: RecordKey) -> Duration {
        let delay = {
            let mut state = self.lock();
            let failures = state.failures.entry(key.clone()).or_insert(0);
            *failures = failures.saturating_add(1);
            self.backoff_for(*failures)
        };
        self.add_after(key, delay);
        delay
    }

    fn backoff_for(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(31);
        self.backoff_base
            .checked_mul(1u32 << exponent)
            .map_or(self.backoff_max, |delay| delay.min(self.backoff_max))
    }

    /// Reset the backoff of a key
    pub fn forget(&self, key: &RecordKey) {
        self.lock().failures.remove(key);
    }

    /// Wait for the next key to process
    ///
    /// Returns `None` once the queue is shut down.
    pub async fn get(&self) -> Option<RecordKey> {
        loop {
            let notified = self.notify.notified();

            let next_deadline = {
                let mut state = self.lock();
                if state.shutdown {
                    return None;
                }

                state.promote_due(Instant::now());

                if let Some(key) = state.ready.pop_front() {
                    state.queued.remove(&key);
                    state.processing.insert(key.clone());
                    let more = !state.ready.is_empty();
                    drop(state);
                    if more {
                        self.notify.notify_one();
                    }
                    return Some(key);
                }

                state.delayed.values().min().copied()
            };

            match next_deadline {
                Some(deadline) => {
                    tokio::select! {
                        _ = notified => {}
                        _ = tokio::time::sleep_until(deadline) => {}
                    }
                }
                None => notified.await,
            }
        }
    }

    /// Mark a key as processed
    ///
    /// If the key was added again while it was being processed it goes back
    /// into the ready queue.
    pub fn done(&self, key: &RecordKey) {
        let requeued = {
            let mut state = self.lock();
            state.processing.remove(key);
            if state.dirty.remove(key) && !state.shutdown {
                state.enqueue(key.clone());
                true
            } else {
                false
            }
        };

        if requeued {
            self.notify.notify_one();
        }
    }

    /// Stop handing out keys and wake every waiting worker
    pub fn shutdown(&self) {
        self.lock().shutdown = true;
        self.notify.notify_waiters();
    }

    /// Number of keys ready for processing
    pub fn len(&self) -> usize {
        self.lock().ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deadline of a delayed key, if any
    pub fn scheduled_at(&self, key: &RecordKey) -> Option<Instant> {
        self.lock().delayed.get(key).copied()
    }
}
