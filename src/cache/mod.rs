//! # Task Cache
//!
//! Concurrent in-memory parcel and episode store with a time-bounded
//! housekeeping sweep.

pub mod sweeper;
pub mod task_cache;

pub use sweeper::CacheSweeper;
pub use task_cache::{CacheStats, SweepReport, TaskCache};
