//! Mode resolution and the update decision
//!
//! Both are pure functions of the fetched record; they never touch a
//! collaborator.

use std::net::IpAddr;

use crate::model::{DesiredRecord, Mode};

/// Classify a record: manual iff it carries an explicit address
pub fn resolve_mode(desired: &DesiredRecord) -> Mode {
    if desired.static_ip.is_some() {
        Mode::Manual
    } else {
        Mode::Dynamic
    }
}

/// Decide whether the remote update call is required
///
/// The call is skipped only when the candidate equals the last applied
/// address and the previous cycle succeeded. A previous failure forces a new
/// attempt even for an unchanged address.
pub fn needs_update(candidate: IpAddr, observed_ip: Option<IpAddr>, last_result: bool) -> bool {
    !(observed_ip == Some(candidate) && last_result)
}
