// Metrics for lock lifecycle observability
// Counters are no-ops until the host application installs a recorder

use metrics::{counter, describe_counter};

pub const LOCK_ACQUIRED_TOTAL: &str = "lock_acquired_total";
pub const LOCK_ACQUIRE_CONFLICTS_TOTAL: &str = "lock_acquire_conflicts_total";
pub const LOCK_RENEWED_TOTAL: &str = "lock_renewed_total";
pub const LOCK_RELEASED_TOTAL: &str = "lock_released_total";
pub const LOCK_RECLAIMED_TOTAL: &str = "lock_reclaimed_total";

/// Initialize all metric descriptions
/// Should be called once at application startup
pub fn describe_metrics() {
    describe_counter!(LOCK_ACQUIRED_TOTAL, "Total number of successful lock acquisitions");
    describe_counter!(
        LOCK_ACQUIRE_CONFLICTS_TOTAL,
        "Total number of acquisitions rejected because the object was locked"
    );
    describe_counter!(LOCK_RENEWED_TOTAL, "Total number of lease renewals");
    describe_counter!(LOCK_RELEASED_TOTAL, "Total number of explicit releases");
    describe_counter!(
        LOCK_RECLAIMED_TOTAL,
        "Total number of expired lock rows deleted by reclamation"
    );
}

pub(crate) fn record_acquired() {
    counter!(LOCK_ACQUIRED_TOTAL).increment(1);
}

pub(crate) fn record_acquire_conflict() {
    counter!(LOCK_ACQUIRE_CONFLICTS_TOTAL).increment(1);
}

pub(crate) fn record_renewed() {
    counter!(LOCK_RENEWED_TOTAL).increment(1);
}

pub(crate) fn record_released() {
    counter!(LOCK_RELEASED_TOTAL).increment(1);
}

pub(crate) fn record_reclaimed(count: u64) {
    counter!(LOCK_RECLAIMED_TOTAL).increment(count);
}
