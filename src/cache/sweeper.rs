//! Background housekeeping for the task cache.
//!
//! A single periodic tokio task runs [`TaskCache::sweep`] on a fixed period.

use super::task_cache::TaskCache;
use crate::config::CacheConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug)]
pub struct CacheSweeper {
    sweeper_id: Uuid,
    cache: Arc<TaskCache>,
    period: Duration,
    initial_delay: Duration,
    handle: Option<JoinHandle<()>>,
}

impl CacheSweeper {
    pub fn new(cache: Arc<TaskCache>, config: &CacheConfig) -> Self {
        let sweeper_id = Uuid::new_v4();
        info!(
            sweeper_id = %sweeper_id,
            period_seconds = config.sweep_period_seconds,
            max_parcel_age_seconds = config.max_parcel_age_seconds,
            "Creating CacheSweeper"
        );
        Self {
            sweeper_id,
            cache,
            period: config.sweep_period(),
            initial_delay: config.sweep_initial_delay(),
            handle: None,
        }
    }

    /// Spawn the sweep loop; must be called inside a tokio runtime
    pub fn start(&mut self) {
        if self.handle.is_some() {
            warn!(sweeper_id = %self.sweeper_id, "Cache sweeper already running");
            return;
        }

        let cache = Arc::clone(&self.cache);
        let sweeper_id = self.sweeper_id;
        let period = self.period;
        let first_tick = Instant::now() + self.initial_delay;

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(first_tick, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                debug!(sweeper_id = %sweeper_id, "Running task cache sweep");
                let report = cache.sweep();
                debug!(
                    sweeper_id = %sweeper_id,
                    examined = report.examined,
                    evicted = report.evicted,
                    "Task cache sweep cycle finished"
                );
            }
        });

        info!(
            sweeper_id = %self.sweeper_id,
            period_seconds = self.period.as_secs(),
            "🧹 Cache sweeper started"
        );
        self.handle = Some(handle);
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            info!(sweeper_id = %self.sweeper_id, "Stopping cache sweeper");
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn sweeper_id(&self) -> Uuid {
        self.sweeper_id
    }
}

impl Drop for CacheSweeper {
    fn drop(&mut self) {
        self.stop();
    }
}
