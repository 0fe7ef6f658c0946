//! # Task Cache
//!
//! In-memory store of parcels keyed by their derived identifier, plus the
//! episodes those parcels belong to. The cache owns parcel lifetime.
//!
//! ## Locking
//!
//! A single coarse `parking_lot::Mutex` guards parcels and episodes together,
//! so compound operations ("check then insert", "update parcel and its
//! episode") are atomic with respect to each other and to the sweep. The sweep
//! snapshots candidate keys first and re-acquires the lock per key, so it never
//! holds the lock for a whole pass.

use crate::config::CacheConfig;
use crate::error::{TaskmeshError, TaskmeshResult};
use crate::identity::Fdn;
use crate::models::{Episode, FulfillmentTask};
use crate::state_machine::ProcessingStatus;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct CacheState {
    parcels: HashMap<Fdn, FulfillmentTask>,
    episodes: HashMap<Fdn, Episode>,
}

impl CacheState {
    fn attach_to_episode(&mut self, parcel: &FulfillmentTask) {
        let episode = self
            .episodes
            .entry(parcel.episode_id().clone())
            .or_insert_with(|| {
                debug!(episode_id = %parcel.episode_id(), "Creating episode");
                Episode::new(
                    parcel.episode_id().clone(),
                    parcel.wup_function_id().clone(),
                    parcel.upstream_episode_id().cloned(),
                    parcel.timestamps().registration,
                )
            });
        episode.attach_parcel(parcel.wup_instance_id().clone(), parcel.id().clone());
    }

    fn detach_from_episode(&mut self, parcel: &FulfillmentTask) {
        if let Some(episode) = self.episodes.get_mut(parcel.episode_id()) {
            episode.detach_parcel(parcel.id());
        }
    }
}

/// Outcome of one housekeeping pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Terminal parcels considered
    pub examined: usize,
    /// Parcels evicted for exceeding the maximum age
    pub evicted: usize,
    /// Terminal parcels without an end date that were stamped this pass
    pub stamped: usize,
    /// Episodes removed because none of their parcels remain
    pub episodes_reclaimed: usize,
}

/// Size and age metrics for leak monitoring
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub parcel_count: usize,
    pub episode_count: usize,
    pub in_progress: usize,
    pub terminal: usize,
    /// Age since registration of the oldest non-terminal parcel, in seconds
    pub oldest_non_terminal_age_seconds: Option<i64>,
}

#[derive(Debug)]
pub struct TaskCache {
    state: Mutex<CacheState>,
    max_parcel_age: Duration,
}

impl TaskCache {
    /// Build from configuration; rejects ages chrono cannot represent
    pub fn new(config: &CacheConfig) -> TaskmeshResult<Self> {
        Ok(Self::with_max_age(config.max_parcel_age_delta()?))
    }

    pub fn with_max_age(max_parcel_age: Duration) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            max_parcel_age,
        }
    }

    pub fn max_parcel_age(&self) -> Duration {
        self.max_parcel_age
    }

    /// Upsert by derived identifier; last write wins
    pub fn add(&self, parcel: FulfillmentTask) {
        let mut state = self.state.lock();
        if let Some(previous) = state.parcels.get(parcel.id()).cloned() {
            debug!(parcel_id = %parcel.id(), "Replacing cached parcel");
            if previous.episode_id() != parcel.episode_id() {
                state.detach_from_episode(&previous);
            }
        }
        state.attach_to_episode(&parcel);
        state.parcels.insert(parcel.id().clone(), parcel);
    }

    /// Insert unless a parcel with the same identifier exists
    ///
    /// Returns the cached parcel and whether it was newly inserted.
    pub fn register_if_absent(&self, parcel: FulfillmentTask) -> (FulfillmentTask, bool) {
        let mut state = self.state.lock();
        if let Some(existing) = state.parcels.get(parcel.id()) {
            return (existing.clone(), false);
        }
        state.attach_to_episode(&parcel);
        state.parcels.insert(parcel.id().clone(), parcel.clone());
        (parcel, true)
    }

    /// Insert unless present and, only for a new parcel, run `on_created`
    /// against its episode, all under one lock
    ///
    /// Returns the cached parcel, whether it was newly inserted, and a
    /// snapshot of its episode taken before the lock is released.
    pub fn register_with_episode(
        &self,
        parcel: FulfillmentTask,
        on_created: impl FnOnce(&FulfillmentTask, &mut Episode),
    ) -> TaskmeshResult<(FulfillmentTask, bool, Episode)> {
        let mut guard = self.state.lock();
        let created = !guard.parcels.contains_key(parcel.id());
        if created {
            guard.attach_to_episode(&parcel);
            guard.parcels.insert(parcel.id().clone(), parcel.clone());
        }

        let CacheState { parcels, episodes } = &mut *guard;
        let cached = parcels
            .get(parcel.id())
            .ok_or_else(|| TaskmeshError::parcel_not_found(parcel.id()))?;
        let episode = episodes
            .get_mut(cached.episode_id())
            .ok_or_else(|| TaskmeshError::episode_not_found(cached.episode_id()))?;
        if created {
            on_created(cached, episode);
        }
        Ok((cached.clone(), created, episode.clone()))
    }

    pub fn get(&self, id: &Fdn) -> TaskmeshResult<FulfillmentTask> {
        self.state
            .lock()
            .parcels
            .get(id)
            .cloned()
            .ok_or_else(|| TaskmeshError::parcel_not_found(id))
    }

    pub fn contains(&self, id: &Fdn) -> bool {
        self.state.lock().parcels.contains_key(id)
    }

    pub fn remove(&self, id: &Fdn) -> Option<FulfillmentTask> {
        let mut state = self.state.lock();
        let removed = state.parcels.remove(id)?;
        state.detach_from_episode(&removed);
        Some(removed)
    }

    pub fn len(&self) -> usize {
        self.state.lock().parcels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().parcels.is_empty()
    }

    pub fn list_by_status(&self, status: ProcessingStatus) -> Vec<FulfillmentTask> {
        self.filter(|p| p.processing_status() == status)
    }

    /// Registered, initiated or active parcels
    pub fn list_in_progress(&self) -> Vec<FulfillmentTask> {
        self.filter(|p| p.processing_status().is_in_progress())
    }

    pub fn list_by_episode(&self, episode_id: &Fdn) -> Vec<FulfillmentTask> {
        self.filter(|p| p.episode_id() == episode_id)
    }

    /// Current parcel of a WUP instance for a unit-of-work type
    ///
    /// Prefers non-terminal parcels, then the most recently registered.
    pub fn find_current_for_wup(
        &self,
        wup_instance_id: &Fdn,
        uow_type_id: &Fdn,
    ) -> Option<FulfillmentTask> {
        let state = self.state.lock();
        state
            .parcels
            .values()
            .filter(|p| p.wup_instance_id() == wup_instance_id && p.uow_type_id() == Some(uow_type_id))
            .max_by_key(|p| {
                (
                    !p.processing_status().is_terminal(),
                    p.timestamps().registration,
                )
            })
            .cloned()
    }

    /// Mutate a cached parcel in place under the cache lock
    pub fn update_parcel<T>(
        &self,
        id: &Fdn,
        update: impl FnOnce(&mut FulfillmentTask) -> TaskmeshResult<T>,
    ) -> TaskmeshResult<T> {
        let mut state = self.state.lock();
        let parcel = state
            .parcels
            .get_mut(id)
            .ok_or_else(|| TaskmeshError::parcel_not_found(id))?;
        update(parcel)
    }

    /// Mutate a cached parcel and its episode atomically
    pub fn update_parcel_and_episode<T>(
        &self,
        id: &Fdn,
        update: impl FnOnce(&mut FulfillmentTask, &mut Episode) -> TaskmeshResult<T>,
    ) -> TaskmeshResult<T> {
        let mut guard = self.state.lock();
        let CacheState { parcels, episodes } = &mut *guard;
        let parcel = parcels
            .get_mut(id)
            .ok_or_else(|| TaskmeshError::parcel_not_found(id))?;
        let episode = episodes
            .get_mut(parcel.episode_id())
            .ok_or_else(|| TaskmeshError::episode_not_found(parcel.episode_id()))?;
        update(parcel, episode)
    }

    pub fn episode(&self, id: &Fdn) -> TaskmeshResult<Episode> {
        self.state
            .lock()
            .episodes
            .get(id)
            .cloned()
            .ok_or_else(|| TaskmeshError::episode_not_found(id))
    }

    pub fn update_episode<T>(
        &self,
        id: &Fdn,
        update: impl FnOnce(&mut Episode) -> TaskmeshResult<T>,
    ) -> TaskmeshResult<T> {
        let mut state = self.state.lock();
        let episode = state
            .episodes
            .get_mut(id)
            .ok_or_else(|| TaskmeshError::episode_not_found(id))?;
        update(episode)
    }

    /// Episode plus a snapshot of its cached parcels, read under one lock
    /// Link a downstream episode to the episode and parcel that produced it
    ///
    /// Registers `interest` on the upstream episode and records
    /// `downstream_episode_id` on both the episode and the producing parcel in
    /// one step. Without an explicit producer the episode's cluster-focus
    /// parcel is used.
    pub fn link_downstream(
        &self,
        upstream_episode_id: &Fdn,
        producing_parcel_id: Option<&Fdn>,
        downstream_episode_id: &Fdn,
        interest: Fdn,
    ) -> TaskmeshResult<()> {
        let mut guard = self.state.lock();
        let CacheState { parcels, episodes } = &mut *guard;
        let episode = episodes
            .get_mut(upstream_episode_id)
            .ok_or_else(|| TaskmeshError::episode_not_found(upstream_episode_id))?;
        episode.register_downstream_interest(interest);
        episode
            .downstream_episode_ids
            .insert(downstream_episode_id.clone());

        let producer = producing_parcel_id.or(episode.cluster_focus.as_ref());
        if let Some(parcel) = producer.and_then(|id| parcels.get_mut(id)) {
            parcel.add_downstream_episode(downstream_episode_id.clone());
        }
        Ok(())
    }

    pub fn episode_with_parcels(&self, id: &Fdn) -> TaskmeshResult<(Episode, Vec<FulfillmentTask>)> {
        let state = self.state.lock();
        let episode = state
            .episodes
            .get(id)
            .cloned()
            .ok_or_else(|| TaskmeshError::episode_not_found(id))?;
        let parcels = episode
            .parcel_ids()
            .filter_map(|pid| state.parcels.get(pid).cloned())
            .collect();
        Ok((episode, parcels))
    }

    pub fn episode_count(&self) -> usize {
        self.state.lock().episodes.len()
    }

    /// Run a housekeeping pass using the current time
    pub fn sweep(&self) -> SweepReport {
        self.sweep_at(Utc::now())
    }

    /// Run a housekeeping pass as of `now`
    ///
    /// Terminal parcels without any end date get a cancellation date of `now`
    /// and are aged from this pass onwards. Terminal parcels older than the
    /// maximum age are evicted. Non-terminal parcels are never touched.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();

        let candidates: Vec<Fdn> = {
            let state = self.state.lock();
            state
                .parcels
                .values()
                .filter(|p| p.processing_status().is_terminal())
                .map(|p| p.id().clone())
                .collect()
        };

        for id in candidates {
            let mut state = self.state.lock();
            let Some(parcel) = state.parcels.get_mut(&id) else {
                continue;
            };
            if !parcel.processing_status().is_terminal() {
                continue;
            }
            report.examined += 1;

            match parcel.age(now) {
                None => {
                    parcel.stamp_cancellation(now);
                    report.stamped += 1;
                    debug!(parcel_id = %id, "Stamped end date on terminal parcel");
                }
                Some(age) if age > self.max_parcel_age => {
                    if let Some(evicted) = state.parcels.remove(&id) {
                        state.detach_from_episode(&evicted);
                        report.evicted += 1;
                        debug!(
                            parcel_id = %id,
                            age_seconds = age.num_seconds(),
                            "Evicted aged parcel"
                        );
                    }
                }
                Some(_) => {}
            }
        }

        {
            let mut state = self.state.lock();
            let before = state.episodes.len();
            state.episodes.retain(|_, episode| episode.parcel_count() > 0);
            report.episodes_reclaimed = before - state.episodes.len();
        }

        if report.evicted > 0 || report.stamped > 0 {
            info!(
                examined = report.examined,
                evicted = report.evicted,
                stamped = report.stamped,
                episodes_reclaimed = report.episodes_reclaimed,
                "🧹 Task cache sweep completed"
            );
        }

        let stats = self.stats(now);
        if let Some(age) = stats.oldest_non_terminal_age_seconds {
            if age > self.max_parcel_age.num_seconds() {
                warn!(
                    oldest_non_terminal_age_seconds = age,
                    in_progress = stats.in_progress,
                    "Non-terminal parcels are older than the eviction age and will not be reclaimed"
                );
            }
        }

        report
    }

    pub fn stats(&self, now: DateTime<Utc>) -> CacheStats {
        let state = self.state.lock();
        let mut stats = CacheStats {
            parcel_count: state.parcels.len(),
            episode_count: state.episodes.len(),
            ..CacheStats::default()
        };
        for parcel in state.parcels.values() {
            let status = parcel.processing_status();
            if status.is_terminal() {
                stats.terminal += 1;
                continue;
            }
            if status.is_in_progress() {
                stats.in_progress += 1;
            }
            let age = (now - parcel.timestamps().registration).num_seconds();
            stats.oldest_non_terminal_age_seconds =
                Some(stats.oldest_non_terminal_age_seconds.map_or(age, |a| a.max(age)));
        }
        stats
    }

    fn filter(&self, predicate: impl Fn(&FulfillmentTask) -> bool) -> Vec<FulfillmentTask> {
        self.state
            .lock()
            .parcels
            .values()
            .filter(|p| predicate(p))
            .cloned()
            .collect()
    }
}

impl Default for TaskCache {
    /// Reference ten-minute maximum age
    fn default() -> Self {
        Self::with_max_age(Duration::minutes(10))
    }
}
