//! # Task Distributor
//!
//! Fans an actionable task out to every participant subscribed to its
//! manifest. Each delivery is a fresh fulfillment task registered in the
//! [`TaskCache`] and handed to the [`Transport`] without waiting for the
//! downstream stage.
//!
//! ## Ordering
//!
//! When the manifest names an explicit intended target, the first remote
//! subscriber with that service name is dispatched to before anyone else and
//! is then skipped during the regular pass, so it receives exactly one copy.
//! Every other subscriber is dispatched to in subscription order.

use crate::cache::TaskCache;
use crate::collaborators::{log_activity_isolated, AuditRecord, AuditSink, Transport};
use crate::constants::events;
use crate::error::TaskmeshResult;
use crate::identity::Fdn;
use crate::logging::log_distribution_operation;
use crate::models::{ActionableTask, DataManifest, FulfillmentTask, TransportPortMetadata, UnitOfWork};
use crate::registry::{Participant, SubscriptionRegistry};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// One fulfillment task produced by a distribution pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dispatch {
    pub participant: Participant,
    pub parcel_id: Fdn,
    pub endpoint: String,
    /// Sent ahead of the regular pass because the manifest targeted it
    pub explicit: bool,
    /// False when the transport refused the hand-off
    pub delivered: bool,
}

pub struct TaskDistributor {
    cache: Arc<TaskCache>,
    subscriptions: Arc<SubscriptionRegistry>,
    transport: Arc<dyn Transport>,
    audit: Arc<dyn AuditSink>,
}

impl std::fmt::Debug for TaskDistributor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskDistributor")
            .field("subscriptions", &self.subscriptions)
            .finish_non_exhaustive()
    }
}

impl TaskDistributor {
    pub fn new(
        cache: Arc<TaskCache>,
        subscriptions: Arc<SubscriptionRegistry>,
        transport: Arc<dyn Transport>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            cache,
            subscriptions,
            transport,
            audit,
        }
    }

    /// Dispatch `task` to every matching subscriber
    ///
    /// Tasks without a routable ingress payload yield no dispatches.
    pub async fn distribute(&self, task: &ActionableTask) -> TaskmeshResult<Vec<Dispatch>> {
        let Some((uow, manifest)) = task.work_item().and_then(|uow| {
            uow.ingress()
                .filter(|payload| payload.is_routable())
                .and_then(|payload| payload.manifest.as_ref())
                .map(|manifest| (uow, manifest))
        }) else {
            debug!(task_id = %task.id(), "Task has nothing to route");
            return Ok(Vec::new());
        };

        let subscribers = self.subscriptions.get_subscribers(manifest).await;
        let wildcard = self.subscriptions.matcher().wildcard().to_string();
        let mut dispatches = Vec::with_capacity(subscribers.len());
        let mut already_sent_to: Option<String> = None;

        if let Some(target) = manifest.explicit_target(&wildcard) {
            match subscribers.iter().find(|p| p.is_remote_named(target)) {
                Some(participant) => {
                    dispatches.push(self.dispatch(task, uow, manifest, participant, &wildcard, true).await);
                    already_sent_to = Some(target.to_string());
                }
                None => {
                    warn!(
                        task_id = %task.id(),
                        intended_target = %target,
                        "Intended target has no matching remote subscriber"
                    );
                }
            }
        }

        for participant in &subscribers {
            if let Some(sent) = already_sent_to.as_deref() {
                if participant.is_remote_named(sent) {
                    continue;
                }
            }
            dispatches.push(self.dispatch(task, uow, manifest, participant, &wildcard, false).await);
        }

        log_distribution_operation(
            task.id(),
            subscribers.len(),
            dispatches.len(),
            dispatches.iter().filter(|d| !d.delivered).count(),
        );
        Ok(dispatches)
    }

    async fn dispatch(
        &self,
        task: &ActionableTask,
        uow: &UnitOfWork,
        manifest: &DataManifest,
        participant: &Participant,
        wildcard: &str,
        explicit: bool,
    ) -> Dispatch {
        let endpoint = self.subscriptions.resolve_endpoint(participant);
        let parcel = build_parcel(task, uow.clone(), manifest, participant, wildcard, &endpoint);
        let parcel_id = parcel.id().clone();

        self.cache.add(parcel.clone());

        let delivered = match self.transport.send(&endpoint, parcel.clone()).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    parcel_id = %parcel_id,
                    endpoint = %endpoint,
                    error = %e,
                    "Transport hand-off failed"
                );
                false
            }
        };

        self.link_downstream(task, participant, &parcel);
        log_activity_isolated(
            self.audit.as_ref(),
            AuditRecord::new(events::TASK_DISPATCHED, parcel),
        )
        .await;

        debug!(
            task_id = %task.id(),
            parcel_id = %parcel_id,
            participant = %participant,
            explicit,
            delivered,
            "Dispatched fulfillment task"
        );
        Dispatch {
            participant: participant.clone(),
            parcel_id,
            endpoint,
            explicit,
            delivered,
        }
    }

    fn link_downstream(&self, task: &ActionableTask, participant: &Participant, parcel: &FulfillmentTask) {
        let Some(episode_id) = &task.episode_id else {
            debug!(task_id = %task.id(), "Task has no producing episode, skipping downstream link");
            return;
        };
        let result = self.cache.link_downstream(
            episode_id,
            task.producing_parcel_id.as_ref(),
            parcel.episode_id(),
            participant.function_id(),
        );
        if let Err(e) = result {
            warn!(
                task_id = %task.id(),
                episode_id = %episode_id,
                error = %e,
                "Could not link downstream episode"
            );
        }
    }
}

/// Clone the task's work item and journey into a parcel scoped to `participant`
fn build_parcel(
    task: &ActionableTask,
    mut uow: UnitOfWork,
    manifest: &DataManifest,
    participant: &Participant,
    wildcard: &str,
    endpoint: &str,
) -> FulfillmentTask {
    if let Some(service_name) = participant.service_name() {
        if manifest.explicit_target(wildcard).is_none() {
            if let Some(m) = uow.ingress_mut().and_then(|p| p.manifest.as_mut()) {
                m.intended_target_system = Some(service_name.to_string());
            }
        }
    }

    let mut traceability = task.traceability().clone();
    traceability.append(task.summary());

    FulfillmentTask::register(
        participant.instance_id(),
        participant.function_id(),
        uow,
        task.episode_id.clone(),
        Utc::now(),
    )
    .with_actionable_task(task.id().clone())
    .with_traceability(traceability)
    .with_port(TransportPortMetadata {
        endpoint: endpoint.to_string(),
        protocol: None,
        host: None,
        port: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{DefaultManifestMatcher, InMemoryTransport, RecordingAuditSink};
    use crate::models::{UoWPayload, UoWProcessingOutcome};
    use crate::registry::PublisherRegistry;

    struct Harness {
        distributor: TaskDistributor,
        cache: Arc<TaskCache>,
        transport: Arc<InMemoryTransport>,
        registry: Arc<SubscriptionRegistry>,
    }

    fn harness() -> Harness {
        let cache = Arc::new(TaskCache::default());
        let transport = Arc::new(InMemoryTransport::new());
        let registry = Arc::new(SubscriptionRegistry::new(
            Arc::new(DefaultManifestMatcher::default()),
            Arc::new(PublisherRegistry::new()),
        ));
        let distributor = TaskDistributor::new(
            cache.clone(),
            registry.clone(),
            transport.clone(),
            Arc::new(RecordingAuditSink::new()),
        );
        Harness {
            distributor,
            cache,
            transport,
            registry,
        }
    }

    fn manifest() -> DataManifest {
        DataManifest::new(Fdn::new("resource", "Observation").unwrap(), "4.0")
    }

    fn task(manifest: DataManifest) -> ActionableTask {
        let uow = UnitOfWork::with_instance_id(
            Fdn::new("uow", "obs-1").unwrap(),
            Fdn::new("uow-type", "observation").unwrap(),
            Some(UoWPayload::new(manifest, "{\"value\": 7}")),
        );
        ActionableTask::new(Fdn::new("task", "t-1").unwrap(), uow)
            .with_wup_function(Fdn::new("wup", "ingest").unwrap())
    }

    fn local_a() -> Participant {
        Participant::local(
            Fdn::new("instance", "a").unwrap(),
            Fdn::new("wup", "triage").unwrap(),
            "local://a",
        )
    }

    #[tokio::test]
    async fn test_unroutable_tasks_yield_no_dispatches() {
        let h = harness();
        h.registry.add_subscriber(manifest(), local_a()).await;

        let no_ingress = ActionableTask::new(
            Fdn::new("task", "t-2").unwrap(),
            UnitOfWork::with_instance_id(
                Fdn::new("uow", "x").unwrap(),
                Fdn::new("uow-type", "observation").unwrap(),
                None,
            ),
        );
        assert!(h.distributor.distribute(&no_ingress).await.unwrap().is_empty());

        let mut empty_content = task(manifest());
        if let Some(uow) = empty_content.core.work_item.as_mut() {
            uow.ingress_mut().unwrap().content = Some(String::new());
        }
        assert!(h.distributor.distribute(&empty_content).await.unwrap().is_empty());
        assert_eq!(h.transport.delivery_count(), 0);
    }

    #[tokio::test]
    async fn test_remote_dispatch_stamps_intended_target() {
        let h = harness();
        h.registry
            .add_subscriber(manifest(), Participant::remote("Lab", "queue://lab"))
            .await;

        let dispatches = h.distributor.distribute(&task(manifest())).await.unwrap();
        assert_eq!(dispatches.len(), 1);
        assert!(!dispatches[0].explicit);

        let delivery = &h.transport.deliveries_to("queue://lab")[0];
        let sent_manifest = delivery.task.uow().unwrap().manifest().unwrap();
        assert_eq!(sent_manifest.intended_target_system.as_deref(), Some("Lab"));
        assert_eq!(delivery.task.core.traceability.len(), 1);
        assert_eq!(
            delivery.task.actionable_task_id().map(Fdn::token),
            Some("[task=t-1]")
        );
        assert!(h.cache.contains(&dispatches[0].parcel_id));
    }

    #[tokio::test]
    async fn test_transport_failure_is_isolated() {
        let h = harness();
        h.registry.add_subscriber(manifest(), local_a()).await;
        h.registry
            .add_subscriber(manifest(), Participant::remote("Lab", "queue://lab"))
            .await;
        h.transport.mark_unreachable("local://a");

        let dispatches = h.distributor.distribute(&task(manifest())).await.unwrap();
        assert_eq!(dispatches.len(), 2);
        assert!(!dispatches[0].delivered);
        assert!(dispatches[1].delivered);
        assert_eq!(h.cache.len(), 2);
    }

    #[tokio::test]
    async fn test_downstream_episode_linked_to_producing_episode_and_parcel() {
        let h = harness();
        h.registry.add_subscriber(manifest(), local_a()).await;

        let producer = FulfillmentTask::register(
            Fdn::new("instance", "ingest-1").unwrap(),
            Fdn::new("wup", "ingest").unwrap(),
            UnitOfWork::with_instance_id(
                Fdn::new("uow", "in-1").unwrap(),
                Fdn::new("uow-type", "hl7").unwrap(),
                None,
            ),
            None,
            Utc::now(),
        );
        let episode_id = producer.episode_id().clone();
        let producer_id = producer.id().clone();
        h.cache.add(producer);

        let mut routed = task(manifest())
            .with_episode(episode_id.clone())
            .with_producing_parcel(producer_id.clone());
        routed.record_outcome(vec![], UoWProcessingOutcome::Success).unwrap();
        let dispatches = h.distributor.distribute(&routed).await.unwrap();
        let clone_episode = h.cache.get(&dispatches[0].parcel_id).unwrap().episode_id().clone();

        let episode = h.cache.episode(&episode_id).unwrap();
        assert!(episode
            .downstream_interests()
            .contains(&Fdn::new("wup", "triage").unwrap()));
        assert!(episode.downstream_episode_ids.contains(&clone_episode));
        let producer = h.cache.get(&producer_id).unwrap();
        assert!(producer.downstream_episode_ids().contains(&clone_episode));
    }
}
