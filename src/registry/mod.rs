//! # Registry Infrastructure
//!
//! Participants, their manifest subscriptions and the remote publishers behind
//! them.
//!
//! ```text
//! Registry Infrastructure
//! ├── SubscriptionRegistry  (manifest -> participants, ordered)
//! └── PublisherRegistry     (remote service instances & availability)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use taskmesh_core::collaborators::DefaultManifestMatcher;
//! use taskmesh_core::identity::Fdn;
//! use taskmesh_core::models::DataManifest;
//! use taskmesh_core::registry::{Participant, PublisherRegistry, SubscriptionRegistry};
//!
//! # tokio_test::block_on(async {
//! let registry = SubscriptionRegistry::new(
//!     Arc::new(DefaultManifestMatcher::default()),
//!     Arc::new(PublisherRegistry::new()),
//! );
//! let manifest = DataManifest::new(Fdn::new("resource", "Observation").unwrap(), "4.0");
//!
//! registry
//!     .add_subscriber(manifest.clone(), Participant::remote("Lab", "queue://lab"))
//!     .await;
//! let subscribers = registry.get_subscribers(&manifest).await;
//! assert_eq!(subscribers.len(), 1);
//! assert!(subscribers[0].is_remote_named("Lab"));
//! # });
//! ```

pub mod participant;
pub mod publisher_registry;
pub mod subscription_registry;

pub use participant::Participant;
pub use publisher_registry::{
    PublisherAvailability, PublisherInstance, PublisherRegistration, PublisherRegistry,
    PublisherStatus,
};
pub use subscription_registry::{Subscription, SubscriptionRegistry};
