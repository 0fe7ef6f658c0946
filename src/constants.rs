//! # System Constants
//!
//! Reference defaults and reserved values shared across the orchestration core.

/// Intended-target marker meaning "any subscriber"
pub const WILDCARD_TARGET: &str = "*";

/// Reference period between cache housekeeping sweeps
pub const DEFAULT_SWEEP_PERIOD_SECONDS: u64 = 60;

/// Reference maximum age of a terminal parcel before eviction
pub const DEFAULT_MAX_PARCEL_AGE_SECONDS: u64 = 10 * 60;

/// Upper bound for any configured period, delay or age (one year)
pub const MAX_CONFIGURED_SECONDS: u64 = 365 * 24 * 60 * 60;

/// Qualifier naming a remote subsystem in participant identifiers
pub const SUBSYSTEM_QUALIFIER: &str = "subsystem";

/// Lifecycle event names emitted in structured logs and audit records
pub mod events {
    pub const PARCEL_REGISTERED: &str = "parcel.registered";
    pub const PARCEL_STARTED: &str = "parcel.started";
    pub const PARCEL_FINISHED: &str = "parcel.finished";
    pub const PARCEL_FAILED: &str = "parcel.failed";
    pub const PARCEL_FINALISED: &str = "parcel.finalised";
    pub const PARCEL_CANCELLED: &str = "parcel.cancelled";
    pub const TASK_DISPATCHED: &str = "task.dispatched";
}
