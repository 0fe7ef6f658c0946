//! # Subscription Registry
//!
//! Which participants want which data. Subscriptions are kept as an ordered
//! list of `(manifest, participant)` pairs so lookups return participants in
//! the order they subscribed.
//!
//! ## Key Features
//!
//! - **Thread-safe subscription management** using RwLock for concurrent access
//! - **Manifest matching** delegated to a [`ManifestMatcher`]
//! - **Idempotent add/remove**, with a publisher availability re-check when a
//!   remote subscription goes away
//! - **One subscriber per remote service**: publisher instances share their
//!   service's subscription and the endpoint is resolved from the live
//!   instances at dispatch time

use super::participant::Participant;
use super::publisher_registry::{PublisherAvailability, PublisherRegistry};
use crate::collaborators::ManifestMatcher;
use crate::models::DataManifest;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subscription {
    pub manifest: DataManifest,
    pub participant: Participant,
}

pub struct SubscriptionRegistry {
    subscriptions: RwLock<Vec<Subscription>>,
    matcher: Arc<dyn ManifestMatcher>,
    publishers: Arc<PublisherRegistry>,
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("matcher", &"<Arc<dyn ManifestMatcher>>".to_string())
            .field("publishers", &self.publishers)
            .finish_non_exhaustive()
    }
}

impl SubscriptionRegistry {
    pub fn new(matcher: Arc<dyn ManifestMatcher>, publishers: Arc<PublisherRegistry>) -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
            matcher,
            publishers,
        }
    }

    pub fn matcher(&self) -> &Arc<dyn ManifestMatcher> {
        &self.matcher
    }

    pub fn publishers(&self) -> &Arc<PublisherRegistry> {
        &self.publishers
    }

    /// Subscribe a participant; returns false if it was already subscribed
    pub async fn add_subscriber(&self, manifest: DataManifest, participant: Participant) -> bool {
        let mut subscriptions = self.subscriptions.write().await;
        if subscriptions
            .iter()
            .any(|s| s.manifest == manifest && s.participant.same_subscriber(&participant))
        {
            debug!(participant = %participant, "Subscription already present");
            return false;
        }

        if let Some(service_name) = participant.service_name() {
            self.publishers.record_subscription(service_name, &manifest);
        }
        info!(
            participant = %participant,
            content_type = %manifest.content_type,
            content_version = %manifest.content_version,
            "➕ Subscriber added"
        );
        subscriptions.push(Subscription {
            manifest,
            participant,
        });
        true
    }

    /// Unsubscribe a participant; returns false if it was not subscribed
    ///
    /// Removing a remote participant re-checks its publisher's availability.
    pub async fn remove_subscriber(&self, manifest: &DataManifest, participant: &Participant) -> bool {
        let removed = {
            let mut subscriptions = self.subscriptions.write().await;
            let before = subscriptions.len();
            subscriptions
                .retain(|s| !(s.manifest == *manifest && s.participant.same_subscriber(participant)));
            subscriptions.len() != before
        };

        if !removed {
            return false;
        }
        info!(participant = %participant, content_type = %manifest.content_type, "➖ Subscriber removed");

        if let Some(service_name) = participant.service_name() {
            self.publishers.retract_subscription(service_name, manifest);
            let availability = self.publishers.check_availability(service_name);
            debug!(service_name = %service_name, ?availability, "Publisher availability re-checked");
        }
        true
    }

    /// Every participant subscribed to a manifest compatible with `manifest`,
    /// in subscription order and without duplicates
    pub async fn get_subscribers(&self, manifest: &DataManifest) -> Vec<Participant> {
        let subscriptions = self.subscriptions.read().await;
        let mut participants: Vec<Participant> = Vec::new();
        for subscription in subscriptions.iter() {
            if self.matcher.matches(&subscription.manifest, manifest)
                && !participants
                    .iter()
                    .any(|p| p.same_subscriber(&subscription.participant))
            {
                participants.push(subscription.participant.clone());
            }
        }
        participants
    }

    /// Endpoint a dispatch to `participant` should use
    ///
    /// Remote services with live publisher instances resolve to one of those
    /// instances; everything else uses the subscribed endpoint.
    pub fn resolve_endpoint(&self, participant: &Participant) -> String {
        participant
            .service_name()
            .and_then(|service_name| self.publishers.live_endpoint(service_name))
            .unwrap_or_else(|| participant.ingress_endpoint().to_string())
    }

    pub async fn subscriptions(&self) -> Vec<Subscription> {
        self.subscriptions.read().await.clone()
    }

    pub async fn subscription_count(&self) -> usize {
        self.subscriptions.read().await.len()
    }

    /// Register a remote publisher and subscribe it to each of its manifests
    pub async fn register_publisher(
        &self,
        service_name: &str,
        instance_id: &str,
        ingress_endpoint: &str,
        subscriptions: Vec<DataManifest>,
    ) -> PublisherAvailability {
        self.publishers.register_publisher(
            service_name,
            instance_id,
            ingress_endpoint,
            subscriptions.clone(),
        );
        for manifest in subscriptions {
            self.add_subscriber(manifest, Participant::remote(service_name, ingress_endpoint))
                .await;
        }
        self.publishers.check_availability(service_name)
    }

    /// Remove a publisher instance
    ///
    /// Subscriptions addressed at the removed instance move to a remaining
    /// live instance; once none remains the service's subscriptions are dropped.
    pub async fn unregister_publisher(&self, service_name: &str, instance_id: &str) -> PublisherAvailability {
        let removed = self.publishers.unregister_publisher(service_name, instance_id);
        let availability = self.publishers.check_availability(service_name);

        if availability == PublisherAvailability::Unavailable {
            let mut subscriptions = self.subscriptions.write().await;
            subscriptions.retain(|s| !s.participant.is_remote_named(service_name));
            info!(service_name = %service_name, "Dropped subscriptions of unavailable publisher");
        } else if let (Some(removed), Some(live)) =
            (removed, self.publishers.live_endpoint(service_name))
        {
            let mut subscriptions = self.subscriptions.write().await;
            for subscription in subscriptions.iter_mut().filter(|s| {
                s.participant.is_remote_named(service_name)
                    && s.participant.ingress_endpoint() == removed.ingress_endpoint
            }) {
                subscription.participant = subscription.participant.with_endpoint(live.as_str());
            }
            debug!(
                service_name = %service_name,
                removed_endpoint = %removed.ingress_endpoint,
                live_endpoint = %live,
                "Re-addressed subscriptions of removed publisher instance"
            );
        }
        availability
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::DefaultManifestMatcher;
    use crate::identity::Fdn;

    fn registry() -> SubscriptionRegistry {
        SubscriptionRegistry::new(
            Arc::new(DefaultManifestMatcher::default()),
            Arc::new(PublisherRegistry::new()),
        )
    }

    fn manifest(version: &str) -> DataManifest {
        DataManifest::new(Fdn::new("resource", "Observation").unwrap(), version)
    }

    fn local(name: &str) -> Participant {
        Participant::local(
            Fdn::new("instance", name).unwrap(),
            Fdn::new("wup", name).unwrap(),
            format!("local://{name}"),
        )
    }

    #[tokio::test]
    async fn test_add_is_idempotent_and_ordered() {
        let registry = registry();
        assert!(registry.add_subscriber(manifest("4.0"), local("a")).await);
        assert!(!registry.add_subscriber(manifest("4.0"), local("a")).await);
        registry
            .add_subscriber(manifest("4.0"), Participant::remote("Lab", "queue://lab"))
            .await;
        registry.add_subscriber(manifest("*"), local("b")).await;

        let subscribers = registry.get_subscribers(&manifest("4.0")).await;
        assert_eq!(
            subscribers,
            vec![local("a"), Participant::remote("Lab", "queue://lab"), local("b")]
        );
        assert_eq!(registry.get_subscribers(&manifest("3.0")).await, vec![local("b")]);
    }

    #[tokio::test]
    async fn test_same_participant_under_two_manifests_listed_once() {
        let registry = registry();
        registry.add_subscriber(manifest("4.0"), local("a")).await;
        registry.add_subscriber(manifest("*"), local("a")).await;
        assert_eq!(registry.subscription_count().await, 2);
        assert_eq!(registry.get_subscribers(&manifest("4.0")).await.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_rechecks_publisher() {
        let registry = registry();
        let lab = Participant::remote("Lab", "queue://lab");
        registry
            .register_publisher("Lab", "lab-1", "queue://lab", vec![manifest("4.0")])
            .await;
        assert!(registry.remove_subscriber(&manifest("4.0"), &lab).await);
        assert!(!registry.remove_subscriber(&manifest("4.0"), &lab).await);
        assert!(registry
            .publishers()
            .registration("Lab")
            .unwrap()
            .subscriptions
            .is_empty());
        assert!(registry.get_subscribers(&manifest("4.0")).await.is_empty());
    }

    #[tokio::test]
    async fn test_unregistering_last_instance_drops_subscriptions() {
        let registry = registry();
        registry
            .register_publisher("Lab", "lab-1", "queue://lab", vec![manifest("4.0")])
            .await;
        registry.add_subscriber(manifest("4.0"), local("a")).await;

        let availability = registry.unregister_publisher("Lab", "lab-1").await;
        assert_eq!(availability, PublisherAvailability::Unavailable);
        assert_eq!(registry.get_subscribers(&manifest("4.0")).await, vec![local("a")]);
    }

    #[tokio::test]
    async fn test_publisher_instances_share_one_subscription() {
        let registry = registry();
        registry
            .register_publisher("Lab", "lab-1", "queue://lab-1", vec![manifest("4.0")])
            .await;
        registry
            .register_publisher("Lab", "lab-2", "queue://lab-2", vec![manifest("4.0")])
            .await;

        let subscribers = registry.get_subscribers(&manifest("4.0")).await;
        assert_eq!(subscribers, vec![Participant::remote("Lab", "queue://lab-1")]);
        assert_eq!(registry.resolve_endpoint(&subscribers[0]), "queue://lab-1");

        let availability = registry.unregister_publisher("Lab", "lab-1").await;
        assert_eq!(availability, PublisherAvailability::Available { instances: 1 });
        let subscribers = registry.get_subscribers(&manifest("4.0")).await;
        assert_eq!(subscribers, vec![Participant::remote("Lab", "queue://lab-2")]);
        assert_eq!(registry.resolve_endpoint(&subscribers[0]), "queue://lab-2");
    }

    #[tokio::test]
    async fn test_unregistered_service_uses_subscribed_endpoint() {
        let registry = registry();
        let pharmacy = Participant::remote("Pharmacy", "queue://pharmacy");
        registry.add_subscriber(manifest("4.0"), pharmacy.clone()).await;
        assert!(
            !registry
                .add_subscriber(manifest("4.0"), pharmacy.with_endpoint("queue://other"))
                .await
        );
        assert_eq!(registry.resolve_endpoint(&pharmacy), "queue://pharmacy");
        assert_eq!(registry.resolve_endpoint(&local("a")), "local://a");
    }
}
