//! Observed-state transition
//!
//! `reconcile_status` turns the fetched status plus the cycle outcome into
//! the status that gets written back. It is a value transformation; the
//! input is never mutated.

use chrono::{DateTime, Utc};
use std::net::IpAddr;

use crate::model::{DesiredRecord, Mode, ObservedState};

/// Outcome of the action part of a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The provider accepted the address
    Updated(IpAddr),
    /// The address was already applied; no remote call was made
    UpToDate(IpAddr),
    /// IP resolution or the update call failed
    Failed,
}

impl CycleOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, CycleOutcome::Failed)
    }

    /// Address to record as applied, if the cycle succeeded
    pub fn applied_ip(&self) -> Option<IpAddr> {
        match self {
            CycleOutcome::Updated(ip) | CycleOutcome::UpToDate(ip) => Some(*ip),
            CycleOutcome::Failed => None,
        }
    }
}

/// Compute the status to persist after a cycle
///
/// The applied address changes only on success; loop time, result, mode and
/// the enabled mirror are always refreshed.
pub fn reconcile_status(
    observed: &ObservedState,
    desired: &DesiredRecord,
    mode: Mode,
    outcome: &CycleOutcome,
    now: DateTime<Utc>,
) -> ObservedState {
    ObservedState {
        enabled: desired.enabled,
        ip_address: outcome.applied_ip().or(observed.ip_address),
        mode: Some(mode),
        last_reconciliation_loop: Some(now),
        last_reconciliation_result: Some(outcome.is_success()),
    }
}
