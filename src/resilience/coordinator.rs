//! # Resilience Coordinator
//!
//! Registers parcels for new work-unit activity, grants focus according to the
//! WUP's (resilience, concurrency) mode pair, answers job-card execution
//! requests and applies the status notifications a WUP sends while it works a
//! parcel.
//!
//! All parcel and episode mutation goes through the [`TaskCache`] coarse lock.
//! Audit writes happen after the lock is released and never fail a call.

use super::focus::{EpisodeFocusView, FocusStrategyRegistry, JobCardSynchronisation};
use crate::cache::TaskCache;
use crate::collaborators::{log_activity_isolated, AuditRecord, AuditSink, TopologyDirectory, WupTopology};
use crate::constants::events;
use crate::error::{TaskmeshError, TaskmeshResult};
use crate::identity::Fdn;
use crate::logging::log_parcel_operation;
use crate::models::{FulfillmentTask, JobCard, UnitOfWork};
use crate::state_machine::{ProcessingStatus, StateMachineError};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Who is asking to register work, and for which unit of work
///
/// Every field is optional at construction so that a caller's missing
/// identifiers surface as a [`TaskmeshError::ContractViolation`] from the
/// coordinator rather than a panic at the call site.
#[derive(Debug, Clone, Default)]
pub struct TaskIdentityContext {
    pub wup_instance_id: Option<Fdn>,
    pub uow: Option<UnitOfWork>,
    pub upstream_episode_id: Option<Fdn>,
    pub actionable_task_id: Option<Fdn>,
}

impl TaskIdentityContext {
    pub fn new(wup_instance_id: Fdn, uow: UnitOfWork) -> Self {
        Self {
            wup_instance_id: Some(wup_instance_id),
            uow: Some(uow),
            ..Self::default()
        }
    }

    pub fn with_upstream_episode(mut self, episode_id: Fdn) -> Self {
        self.upstream_episode_id = Some(episode_id);
        self
    }

    pub fn with_actionable_task(mut self, task_id: Fdn) -> Self {
        self.actionable_task_id = Some(task_id);
        self
    }
}

/// Result of registering new work-unit activity
#[derive(Debug, Clone, PartialEq)]
pub struct ParcelRegistration {
    pub parcel: FulfillmentTask,
    /// False when an existing parcel for the same WUP and unit of work was returned
    pub created: bool,
    pub has_cluster_focus: bool,
    pub has_site_focus: bool,
}

pub struct ResilienceCoordinator {
    cache: Arc<TaskCache>,
    topology: Arc<dyn TopologyDirectory>,
    strategies: FocusStrategyRegistry,
    audit: Arc<dyn AuditSink>,
}

impl std::fmt::Debug for ResilienceCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilienceCoordinator")
            .field("strategies", &self.strategies)
            .finish_non_exhaustive()
    }
}

impl ResilienceCoordinator {
    pub fn new(
        cache: Arc<TaskCache>,
        topology: Arc<dyn TopologyDirectory>,
        strategies: FocusStrategyRegistry,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            cache,
            topology,
            strategies,
            audit,
        }
    }

    pub fn cache(&self) -> &Arc<TaskCache> {
        &self.cache
    }

    async fn resolve_topology(&self, wup_instance_id: &Fdn) -> TaskmeshResult<WupTopology> {
        self.topology
            .resolve_wup(wup_instance_id)
            .await
            .ok_or_else(|| {
                TaskmeshError::contract(format!(
                    "WUP instance {wup_instance_id} is not known to the topology directory"
                ))
            })
    }

    /// Register a parcel for a WUP instance working a unit of work
    ///
    /// Idempotent per (WUP instance, unit-of-work instance): a second call
    /// returns the cached parcel unchanged. Focus is granted only when the
    /// parcel is newly created and the mode pair's strategy grants it.
    pub async fn register_new_work_unit_activity(
        &self,
        context: TaskIdentityContext,
    ) -> TaskmeshResult<ParcelRegistration> {
        let wup_instance_id = context
            .wup_instance_id
            .ok_or_else(|| TaskmeshError::contract("task identity context has no WUP instance"))?;
        let uow = context
            .uow
            .ok_or_else(|| TaskmeshError::contract("task identity context has no unit of work"))?;

        let topology = self.resolve_topology(&wup_instance_id).await?;
        let now = Utc::now();

        let mut candidate = FulfillmentTask::register(
            wup_instance_id,
            topology.function_id.clone(),
            uow,
            context.upstream_episode_id,
            now,
        );
        if let Some(task_id) = context.actionable_task_id {
            candidate = candidate.with_actionable_task(task_id);
        }

        let strategy = self
            .strategies
            .strategy_for(topology.resilience_mode, topology.concurrency_mode);
        let (parcel, created, episode) =
            self.cache.register_with_episode(candidate, |parcel, episode| {
                let decision = strategy.on_registration(parcel, episode);
                episode.grant_focus(parcel.id(), decision.cluster, decision.site, now);
            })?;

        if created {
            info!(
                parcel_id = %parcel.id(),
                episode_id = %parcel.episode_id(),
                resilience_mode = %topology.resilience_mode,
                concurrency_mode = %topology.concurrency_mode,
                focus_strategy = strategy.name(),
                "📦 Parcel registered"
            );
            log_activity_isolated(
                self.audit.as_ref(),
                AuditRecord::new(events::PARCEL_REGISTERED, parcel.clone()),
            )
            .await;
        } else {
            debug!(parcel_id = %parcel.id(), "Parcel already registered, returning cached entry");
        }

        Ok(ParcelRegistration {
            has_cluster_focus: episode.has_cluster_focus(parcel.id()),
            has_site_focus: episode.has_site_focus(parcel.id()),
            parcel,
            created,
        })
    }

    /// Answer a job card's execution request
    ///
    /// On a grant the card's `granted_status` and `update_date` are written.
    /// A deferred answer leaves the card untouched.
    pub async fn synchronise_job_card(
        &self,
        job_card: &mut JobCard,
    ) -> TaskmeshResult<JobCardSynchronisation> {
        let topology = self.resolve_topology(&job_card.wup_instance_id).await?;
        let empty_episode = || {
            TaskmeshError::contract(format!(
                "episode {} has no parcels to synchronise against",
                job_card.episode_id
            ))
        };
        let (episode, parcels) = self
            .cache
            .episode_with_parcels(&job_card.episode_id)
            .map_err(|e| if e.is_not_found() { empty_episode() } else { e })?;
        if parcels.is_empty() {
            return Err(empty_episode());
        }

        let view = EpisodeFocusView {
            episode: &episode,
            parcels: &parcels,
            cluster_focus: episode.cluster_focus.as_ref(),
            site_focus: episode.site_focus.as_ref(),
        };
        let strategy = self
            .strategies
            .strategy_for(topology.resilience_mode, topology.concurrency_mode);
        let outcome = strategy.synchronise(job_card, &view);

        match outcome {
            JobCardSynchronisation::Granted(status) => {
                job_card.granted_status = status;
                job_card.update_date = Utc::now();
                debug!(
                    parcel_id = %job_card.parcel_id,
                    granted_status = %status,
                    "Job card request granted"
                );
            }
            JobCardSynchronisation::Deferred => {
                debug!(
                    parcel_id = %job_card.parcel_id,
                    requested_status = %job_card.requested_status,
                    focus_strategy = strategy.name(),
                    "Job card request deferred"
                );
            }
        }
        Ok(outcome)
    }

    pub async fn notify_start(&self, parcel_id: &Fdn) -> TaskmeshResult<FulfillmentTask> {
        self.apply_status(parcel_id, ProcessingStatus::Active, events::PARCEL_STARTED, |_| Ok(()))
            .await
    }

    /// Record completion with the unit of work as the WUP left it
    pub async fn notify_finish(
        &self,
        parcel_id: &Fdn,
        uow: UnitOfWork,
    ) -> TaskmeshResult<FulfillmentTask> {
        self.apply_status(parcel_id, ProcessingStatus::Finished, events::PARCEL_FINISHED, |parcel| {
            replace_uow(parcel, uow)
        })
        .await
    }

    pub async fn notify_failure(
        &self,
        parcel_id: &Fdn,
        uow: Option<UnitOfWork>,
        reason: &str,
    ) -> TaskmeshResult<FulfillmentTask> {
        self.apply_status(parcel_id, ProcessingStatus::Failed, events::PARCEL_FAILED, |parcel| {
            if let Some(uow) = uow {
                replace_uow(parcel, uow)?;
            }
            let already_final = parcel.uow().is_some_and(|u| u.outcome().is_final());
            if !already_final {
                parcel.record_failure(reason)?;
            }
            Ok(())
        })
        .await
    }

    /// Finalise a parcel whose processing has ended
    pub async fn notify_finalisation(&self, parcel_id: &Fdn) -> TaskmeshResult<FulfillmentTask> {
        self.apply_status(
            parcel_id,
            ProcessingStatus::Finalised,
            events::PARCEL_FINALISED,
            |parcel| {
                let current = parcel.processing_status();
                if current.is_terminal() {
                    Ok(())
                } else {
                    Err(StateMachineError::InvalidTransition {
                        from: current,
                        to: ProcessingStatus::Finalised,
                    }
                    .into())
                }
            },
        )
        .await
    }

    pub async fn notify_cancellation(&self, parcel_id: &Fdn) -> TaskmeshResult<FulfillmentTask> {
        self.apply_status(
            parcel_id,
            ProcessingStatus::Cancelled,
            events::PARCEL_CANCELLED,
            |_| Ok(()),
        )
        .await
    }

    /// Whether every downstream function registered against an episode has reacted
    pub fn downstream_complete(&self, episode_id: &Fdn) -> TaskmeshResult<bool> {
        Ok(self.cache.episode(episode_id)?.all_downstream_reacted())
    }

    /// Move a parcel to `status` (or its `*Elsewhere` form without cluster
    /// focus) and fold the change into its episode
    async fn apply_status(
        &self,
        parcel_id: &Fdn,
        status: ProcessingStatus,
        event: &'static str,
        prepare: impl FnOnce(&mut FulfillmentTask) -> TaskmeshResult<()>,
    ) -> TaskmeshResult<FulfillmentTask> {
        let now = Utc::now();
        let updated = self
            .cache
            .update_parcel_and_episode(parcel_id, |parcel, episode| {
                let focused = episode.has_cluster_focus(parcel.id());
                let next = if focused { status } else { status.elsewhere() };
                let current = parcel.processing_status();
                if !current.can_transition_to(next) {
                    return Err(StateMachineError::InvalidTransition { from: current, to: next }.into());
                }

                prepare(parcel)?;
                parcel.transition_to(next, now)?;
                episode.observe_status(next, now);

                match next {
                    ProcessingStatus::Active => {
                        episode.active_wup_instance = Some(parcel.wup_instance_id().clone());
                    }
                    s if s.is_terminal()
                        && episode.active_wup_instance.as_ref() == Some(parcel.wup_instance_id()) =>
                    {
                        episode.active_wup_instance = None;
                    }
                    _ => {}
                }
                Ok(parcel.clone())
            })?;

        if updated.processing_status().is_terminal() {
            self.record_upstream_reaction(&updated);
        }

        log_parcel_operation(
            event,
            updated.id(),
            Some(updated.episode_id()),
            updated.processing_status(),
            None,
        );
        log_activity_isolated(self.audit.as_ref(), AuditRecord::new(event, updated.clone())).await;
        Ok(updated)
    }

    fn record_upstream_reaction(&self, parcel: &FulfillmentTask) {
        let Some(upstream) = parcel.upstream_episode_id() else {
            return;
        };
        let result = self.cache.update_episode(upstream, |episode| {
            Ok(episode.record_downstream_reaction(parcel.wup_function_id()))
        });
        if let Err(e) = result {
            // Upstream episodes may already have been reclaimed by the sweep
            warn!(
                parcel_id = %parcel.id(),
                upstream_episode_id = %upstream,
                error = %e,
                "Could not record downstream reaction"
            );
        }
    }
}

fn replace_uow(parcel: &mut FulfillmentTask, uow: UnitOfWork) -> TaskmeshResult<()> {
    if parcel.replace_uow(uow) {
        Ok(())
    } else {
        Err(TaskmeshError::contract(format!(
            "unit of work reported for parcel {} has a different instance identity",
            parcel.id()
        )))
    }
}
