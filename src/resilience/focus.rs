//! # Focus Strategies
//!
//! Focus is the right to act as the authoritative executor for an episode,
//! held separately at cluster and site scope. Which replica receives focus
//! depends on the WUP's (resilience, concurrency) mode pair, so the decision is
//! delegated to a [`FocusStrategy`] looked up by that pair.
//!
//! Only the standalone/standalone pair has a built-in grant: a single replica
//! can never contend with another. Every other pair resolves to
//! [`DeferredFocusStrategy`], which registers without focus and leaves job
//! cards untouched until an election protocol is plugged in through
//! [`FocusStrategyRegistry::with_strategy`].

use super::modes::{ConcurrencyMode, ModePair, ResilienceMode};
use crate::identity::Fdn;
use crate::models::{Episode, FulfillmentTask, JobCard};
use crate::state_machine::ActivityStatus;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Focus scopes to grant a freshly registered parcel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FocusDecision {
    pub cluster: bool,
    pub site: bool,
}

impl FocusDecision {
    pub const NONE: FocusDecision = FocusDecision {
        cluster: false,
        site: false,
    };

    pub const FULL: FocusDecision = FocusDecision {
        cluster: true,
        site: true,
    };
}

/// What the coordinator sees of an episode when synchronising a job card
#[derive(Debug, Clone, Copy)]
pub struct EpisodeFocusView<'a> {
    pub episode: &'a Episode,
    pub parcels: &'a [FulfillmentTask],
    pub cluster_focus: Option<&'a Fdn>,
    pub site_focus: Option<&'a Fdn>,
}

/// Answer to a job card's execution request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobCardSynchronisation {
    Granted(ActivityStatus),
    /// No grant decided for this replica yet
    Deferred,
}

pub trait FocusStrategy: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Focus to grant when a parcel is first registered
    fn on_registration(&self, parcel: &FulfillmentTask, episode: &Episode) -> FocusDecision;

    /// Decide whether the job card's requested status is granted
    fn synchronise(&self, job_card: &JobCard, view: &EpisodeFocusView<'_>) -> JobCardSynchronisation;
}

/// Single writer: full focus on registration, every request granted
#[derive(Debug, Default, Clone, Copy)]
pub struct StandaloneFocusStrategy;

impl FocusStrategy for StandaloneFocusStrategy {
    fn name(&self) -> &'static str {
        "standalone"
    }

    fn on_registration(&self, _parcel: &FulfillmentTask, _episode: &Episode) -> FocusDecision {
        FocusDecision::FULL
    }

    fn synchronise(&self, job_card: &JobCard, _view: &EpisodeFocusView<'_>) -> JobCardSynchronisation {
        JobCardSynchronisation::Granted(job_card.requested_status)
    }
}

/// Placeholder for clustered and multi-site election
#[derive(Debug, Default, Clone, Copy)]
pub struct DeferredFocusStrategy;

impl FocusStrategy for DeferredFocusStrategy {
    fn name(&self) -> &'static str {
        "deferred"
    }

    fn on_registration(&self, _parcel: &FulfillmentTask, _episode: &Episode) -> FocusDecision {
        FocusDecision::NONE
    }

    fn synchronise(&self, _job_card: &JobCard, _view: &EpisodeFocusView<'_>) -> JobCardSynchronisation {
        JobCardSynchronisation::Deferred
    }
}

/// Strategies keyed by mode pair, with a fallback for unregistered pairs
#[derive(Debug, Clone)]
pub struct FocusStrategyRegistry {
    strategies: HashMap<ModePair, Arc<dyn FocusStrategy>>,
    fallback: Arc<dyn FocusStrategy>,
}

impl FocusStrategyRegistry {
    /// Registry with no pair-specific strategies
    pub fn empty(fallback: Arc<dyn FocusStrategy>) -> Self {
        Self {
            strategies: HashMap::new(),
            fallback,
        }
    }

    /// Install or replace the strategy for a mode pair
    pub fn with_strategy(
        mut self,
        resilience: ResilienceMode,
        concurrency: ConcurrencyMode,
        strategy: Arc<dyn FocusStrategy>,
    ) -> Self {
        self.strategies.insert((resilience, concurrency), strategy);
        self
    }

    pub fn strategy_for(
        &self,
        resilience: ResilienceMode,
        concurrency: ConcurrencyMode,
    ) -> Arc<dyn FocusStrategy> {
        self.strategies
            .get(&(resilience, concurrency))
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.fallback))
    }
}

impl Default for FocusStrategyRegistry {
    fn default() -> Self {
        Self::empty(Arc::new(DeferredFocusStrategy)).with_strategy(
            ResilienceMode::Standalone,
            ConcurrencyMode::Standalone,
            Arc::new(StandaloneFocusStrategy),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataManifest, UnitOfWork, UoWPayload};
    use chrono::Utc;

    fn parcel_and_episode() -> (FulfillmentTask, Episode) {
        let manifest = DataManifest::new(Fdn::new("resource", "Patient").unwrap(), "1");
        let parcel = FulfillmentTask::register(
            Fdn::new("instance", "1").unwrap(),
            Fdn::new("wup", "ingest").unwrap(),
            UnitOfWork::new(
                Fdn::new("uow-type", "adt").unwrap(),
                UoWPayload::new(manifest, "{}"),
            ),
            None,
            Utc::now(),
        );
        let episode = Episode::new(
            parcel.episode_id().clone(),
            parcel.wup_function_id().clone(),
            None,
            Utc::now(),
        );
        (parcel, episode)
    }

    #[test]
    fn test_default_registry_grants_only_standalone_pair() {
        let registry = FocusStrategyRegistry::default();
        let (parcel, episode) = parcel_and_episode();
        for resilience in ResilienceMode::ALL {
            for concurrency in ConcurrencyMode::ALL {
                let decision = registry
                    .strategy_for(resilience, concurrency)
                    .on_registration(&parcel, &episode);
                let standalone = resilience == ResilienceMode::Standalone
                    && concurrency == ConcurrencyMode::Standalone;
                assert_eq!(decision == FocusDecision::FULL, standalone);
                assert_eq!(decision == FocusDecision::NONE, !standalone);
            }
        }
    }

    #[test]
    fn test_override_replaces_strategy_for_pair() {
        let registry = FocusStrategyRegistry::default().with_strategy(
            ResilienceMode::Clustered,
            ConcurrencyMode::Concurrent,
            Arc::new(StandaloneFocusStrategy),
        );
        assert_eq!(
            registry
                .strategy_for(ResilienceMode::Clustered, ConcurrencyMode::Concurrent)
                .name(),
            "standalone"
        );
        assert_eq!(
            registry
                .strategy_for(ResilienceMode::Clustered, ConcurrencyMode::OnDemand)
                .name(),
            "deferred"
        );
    }

    #[test]
    fn test_synchronise_outcomes() {
        let (parcel, episode) = parcel_and_episode();
        let card = JobCard::new(
            parcel.id().clone(),
            parcel.episode_id().clone(),
            parcel.wup_instance_id().clone(),
        )
        .request(ActivityStatus::Executing);
        let parcels = vec![parcel];
        let view = EpisodeFocusView {
            episode: &episode,
            parcels: &parcels,
            cluster_focus: None,
            site_focus: None,
        };
        assert_eq!(
            StandaloneFocusStrategy.synchronise(&card, &view),
            JobCardSynchronisation::Granted(ActivityStatus::Executing)
        );
        assert_eq!(
            DeferredFocusStrategy.synchronise(&card, &view),
            JobCardSynchronisation::Deferred
        );
    }
}
