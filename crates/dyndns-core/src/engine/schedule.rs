//! Scheduling gate and requeue policy
//!
//! The engine owns no timers. It tells the dispatcher when the record should
//! be looked at again through the returned [`Action`].

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::model::{Mode, ObservedState};

/// What the dispatcher should do with a record after a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    requeue_after: Option<Duration>,
}

impl Action {
    /// Evaluate the record again after `duration`
    pub fn requeue(duration: Duration) -> Self {
        Self {
            requeue_after: Some(duration),
        }
    }

    /// Terminal outcome: only a desired-state change triggers the next cycle
    pub fn await_change() -> Self {
        Self {
            requeue_after: None,
        }
    }

    pub fn requeue_after(&self) -> Option<Duration> {
        self.requeue_after
    }

    pub fn is_terminal(&self) -> bool {
        self.requeue_after.is_none()
    }
}

/// Result of the scheduling gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Run the full pipeline now
    Proceed,
    /// Woken too early: come back after `requeue_after`
    Skip { requeue_after: Duration },
}

/// Convert an interval in minutes to a duration
pub fn interval_duration(interval_minutes: u32) -> Duration {
    Duration::from_secs(u64::from(interval_minutes) * 60)
}

/// Decide whether a cycle should run now
///
/// Only dynamic mode is gated. A cycle is skipped when the previous one
/// succeeded less than `interval_minutes` ago; a failed previous cycle never
/// coasts on the interval.
pub fn should_run_now(
    observed: &ObservedState,
    interval_minutes: u32,
    mode: Mode,
    now: DateTime<Utc>,
) -> Gate {
    if mode == Mode::Manual || !observed.was_successful() {
        return Gate::Proceed;
    }

    let Some(last_loop) = observed.last_reconciliation_loop else {
        return Gate::Proceed;
    };

    let interval = interval_duration(interval_minutes);
    // A loop timestamp ahead of `now` counts as zero elapsed time
    let elapsed = now
        .signed_duration_since(last_loop)
        .to_std()
        .unwrap_or_default();

    if elapsed < interval {
        Gate::Skip {
            requeue_after: interval - elapsed,
        }
    } else {
        Gate::Proceed
    }
}

/// Next action after the status was written
///
/// A successful manual cycle is terminal; everything else is evaluated again
/// after one interval.
pub fn next_action(mode: Mode, success: bool, interval_minutes: u32) -> Action {
    if mode == Mode::Manual && success {
        Action::await_change()
    } else {
        Action::requeue(interval_duration(interval_minutes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn observed(result: Option<bool>, minutes_ago: Option<i64>) -> ObservedState {
        ObservedState {
            enabled: true,
            ip_address: Some("1.2.3.4".parse().unwrap()),
            mode: Some(Mode::Dynamic),
            last_reconciliation_loop: minutes_ago.map(|m| now() - chrono::Duration::minutes(m)),
            last_reconciliation_result: result,
        }
    }

    #[test]
    fn test_recent_success_skips_with_remaining_interval() {
        let gate = should_run_now(&observed(Some(true), Some(2)), 5, Mode::Dynamic, now());
        assert_eq!(
            gate,
            Gate::Skip {
                requeue_after: Duration::from_secs(3 * 60)
            }
        );
    }

    #[test]
    fn test_recent_failure_proceeds() {
        let gate = should_run_now(&observed(Some(false), Some(2)), 5, Mode::Dynamic, now());
        assert_eq!(gate, Gate::Proceed);
    }

    #[test]
    fn test_never_run_proceeds() {
        let gate = should_run_now(&ObservedState::default(), 5, Mode::Dynamic, now());
        assert_eq!(gate, Gate::Proceed);

        let gate = should_run_now(&observed(Some(true), None), 5, Mode::Dynamic, now());
        assert_eq!(gate, Gate::Proceed);
    }

    #[test]
    fn test_elapsed_interval_proceeds() {
        let gate = should_run_now(&observed(Some(true), Some(5)), 5, Mode::Dynamic, now());
        assert_eq!(gate, Gate::Proceed);

        let gate = should_run_now(&observed(Some(true), Some(60)), 10, Mode::Dynamic, now());
        assert_eq!(gate, Gate::Proceed);
    }

    #[test]
    fn test_manual_mode_is_never_gated() {
        let gate = should_run_now(&observed(Some(true), Some(1)), 5, Mode::Manual, now());
        assert_eq!(gate, Gate::Proceed);
    }

    #[test]
    fn test_skip_duration_never_negative() {
        for interval in [5u32, 7, 30, 1440] {
            for minutes_ago in 0..i64::from(interval) {
                let gate = should_run_now(
                    &observed(Some(true), Some(minutes_ago)),
                    interval,
                    Mode::Dynamic,
                    now(),
                );
                match gate {
                    Gate::Skip { requeue_after } => {
                        assert!(requeue_after <= interval_duration(interval));
                        assert_eq!(
                            requeue_after,
                            Duration::from_secs((i64::from(interval) - minutes_ago) as u64 * 60)
                        );
                    }
                    Gate::Proceed => panic!("expected skip at {} of {}", minutes_ago, interval),
                }
            }
        }
    }

    #[test]
    fn test_future_timestamp_counts_as_zero_elapsed() {
        let gate = should_run_now(&observed(Some(true), Some(-3)), 5, Mode::Dynamic, now());
        assert_eq!(
            gate,
            Gate::Skip {
                requeue_after: Duration::from_secs(5 * 60)
            }
        );
    }

    #[test]
    fn test_requeue_policy() {
        assert!(next_action(Mode::Manual, true, 5).is_terminal());
        assert_eq!(
            next_action(Mode::Manual, false, 5).requeue_after(),
            Some(Duration::from_secs(300))
        );
        assert_eq!(
            next_action(Mode::Dynamic, true, 15).requeue_after(),
            Some(Duration::from_secs(900))
        );
        assert_eq!(
            next_action(Mode::Dynamic, false, 5).requeue_after(),
            Some(Duration::from_secs(300))
        );
    }
}
