//! Platform-internal test accounts excluded from all statistics.

use crate::stats::Uid;

/// Uids of internal QA/demo accounts. Events and orders from these accounts
/// never reach a statistics row.
pub const INTERNAL_UIDS: &[Uid] = &[10001, 10002, 10003, 900001, 900002];

pub fn is_internal_account(uid: Uid) -> bool {
    INTERNAL_UIDS.contains(&uid)
}
