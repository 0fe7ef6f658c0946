//! # Distribution
//!
//! Fan-out of actionable tasks to subscribed participants.

pub mod task_distributor;

pub use task_distributor::{Dispatch, TaskDistributor};
