//! # Publisher Registry
//!
//! Remote subsystems announce themselves here with their instances and the
//! manifests they subscribe to. Availability is re-derived on demand from the
//! registered instances.

use crate::models::DataManifest;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublisherInstance {
    pub instance_id: String,
    pub ingress_endpoint: String,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublisherStatus {
    Available,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublisherRegistration {
    pub service_name: String,
    pub instances: Vec<PublisherInstance>,
    pub subscriptions: Vec<DataManifest>,
    pub status: PublisherStatus,
    pub last_checked_at: DateTime<Utc>,
}

/// Result of an availability check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublisherAvailability {
    Available { instances: usize },
    Unavailable,
    /// The service never registered
    Unknown,
}

#[derive(Debug, Default)]
pub struct PublisherRegistry {
    registrations: DashMap<String, PublisherRegistration>,
}

impl PublisherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or refresh one instance of a service
    ///
    /// Re-registering an instance replaces its endpoint. Subscriptions are
    /// merged without duplicates.
    pub fn register_publisher(
        &self,
        service_name: &str,
        instance_id: &str,
        ingress_endpoint: &str,
        subscriptions: Vec<DataManifest>,
    ) -> PublisherRegistration {
        let now = Utc::now();
        let mut entry = self
            .registrations
            .entry(service_name.to_string())
            .or_insert_with(|| PublisherRegistration {
                service_name: service_name.to_string(),
                instances: Vec::new(),
                subscriptions: Vec::new(),
                status: PublisherStatus::Unavailable,
                last_checked_at: now,
            });

        entry.instances.retain(|i| i.instance_id != instance_id);
        entry.instances.push(PublisherInstance {
            instance_id: instance_id.to_string(),
            ingress_endpoint: ingress_endpoint.to_string(),
            registered_at: now,
        });
        for manifest in subscriptions {
            if !entry.subscriptions.contains(&manifest) {
                entry.subscriptions.push(manifest);
            }
        }
        entry.status = PublisherStatus::Available;
        entry.last_checked_at = now;

        info!(
            service_name = %service_name,
            instance_id = %instance_id,
            instances = entry.instances.len(),
            "📡 Publisher registered"
        );
        entry.clone()
    }

    /// Remove one instance, returning it; `None` when it was not registered
    pub fn unregister_publisher(
        &self,
        service_name: &str,
        instance_id: &str,
    ) -> Option<PublisherInstance> {
        let removed = self.registrations.get_mut(service_name).and_then(|mut entry| {
            let position = entry
                .instances
                .iter()
                .position(|i| i.instance_id == instance_id)?;
            Some(entry.instances.remove(position))
        });
        if removed.is_some() {
            debug!(service_name = %service_name, instance_id = %instance_id, "Publisher instance removed");
            self.check_availability(service_name);
        }
        removed
    }

    /// Ingress endpoint of the longest-registered live instance
    pub fn live_endpoint(&self, service_name: &str) -> Option<String> {
        self.registrations
            .get(service_name)
            .and_then(|entry| entry.instances.first().map(|i| i.ingress_endpoint.clone()))
    }

    /// Note a manifest a service subscribes to; ignored for unknown services
    pub fn record_subscription(&self, service_name: &str, manifest: &DataManifest) {
        if let Some(mut entry) = self.registrations.get_mut(service_name) {
            if !entry.subscriptions.contains(manifest) {
                entry.subscriptions.push(manifest.clone());
            }
        }
    }

    pub fn retract_subscription(&self, service_name: &str, manifest: &DataManifest) {
        if let Some(mut entry) = self.registrations.get_mut(service_name) {
            entry.subscriptions.retain(|m| m != manifest);
        }
    }

    /// Re-derive a service's status from its registered instances
    pub fn check_availability(&self, service_name: &str) -> PublisherAvailability {
        let Some(mut entry) = self.registrations.get_mut(service_name) else {
            return PublisherAvailability::Unknown;
        };
        entry.last_checked_at = Utc::now();
        if entry.instances.is_empty() {
            if entry.status == PublisherStatus::Available {
                warn!(service_name = %service_name, "Publisher has no remaining instances, marking unavailable");
            }
            entry.status = PublisherStatus::Unavailable;
            PublisherAvailability::Unavailable
        } else {
            entry.status = PublisherStatus::Available;
            PublisherAvailability::Available {
                instances: entry.instances.len(),
            }
        }
    }

    pub fn registration(&self, service_name: &str) -> Option<PublisherRegistration> {
        self.registrations.get(service_name).map(|e| e.value().clone())
    }

    /// All registrations ordered by service name
    pub fn list_registrations(&self) -> Vec<PublisherRegistration> {
        let mut all: Vec<PublisherRegistration> = self
            .registrations
            .iter()
            .map(|e| e.value().clone())
            .collect();
        all.sort_by(|a, b| a.service_name.cmp(&b.service_name));
        all
    }
}
