#![allow(clippy::doc_markdown)] // Allow technical terms like FDN, UoW, WUP in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Taskmesh Core
//!
//! Task-orchestration core for a mesh of Work Unit Processors (WUPs).
//!
//! ## Overview
//!
//! Every unit of work (UoW) moving through the mesh is tracked as a parcel: one
//! execution attempt by one WUP instance. Parcels of the same WUP function
//! working the same UoW form an episode. The core:
//!
//! - derives stable hierarchical identifiers (FDNs) for parcels, episodes and types
//! - caches parcels and episodes, evicting terminal parcels after a maximum age
//! - registers new work idempotently and grants focus to the authoritative replica
//! - fans actionable tasks out to every subscribed participant
//!
//! ## Module Organization
//!
//! - [`identity`] - FDN/RDN identifiers and identity derivation
//! - [`models`] - Units of work, tasks, parcels, episodes and job cards
//! - [`state_machine`] - Processing-status lattice and related statuses
//! - [`cache`] - Task cache and background sweep
//! - [`resilience`] - Focus strategies and the resilience coordinator
//! - [`registry`] - Participants, subscriptions and publishers
//! - [`distribution`] - Task fan-out
//! - [`collaborators`] - Consumed services and in-memory implementations
//! - [`system_context`] - Explicit wiring of everything above
//! - [`config`] - Layered configuration
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use taskmesh_core::system_context::{Collaborators, SystemContext};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! taskmesh_core::logging::init_structured_logging();
//!
//! let context = SystemContext::new(Collaborators::in_memory())?;
//! let housekeeping = context.start_housekeeping();
//!
//! // Register work with context.coordinator, route it with context.distributor
//!
//! housekeeping.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod collaborators;
pub mod config;
pub mod constants;
pub mod distribution;
pub mod error;
pub mod identity;
pub mod logging;
pub mod models;
pub mod registry;
pub mod resilience;
pub mod state_machine;
pub mod system_context;

pub use cache::{CacheStats, CacheSweeper, SweepReport, TaskCache};
pub use collaborators::{
    AuditRecord, AuditSink, DefaultManifestMatcher, ManifestMatcher, TopologyDirectory, Transport,
    WupTopology,
};
pub use config::{ConfigManager, TaskmeshConfig};
pub use distribution::{Dispatch, TaskDistributor};
pub use error::{TaskmeshError, TaskmeshResult};
pub use identity::{Fdn, IdentifierError, Rdn};
pub use models::{
    ActionableTask, DataManifest, Episode, FulfillmentTask, JobCard, OversightTask, Parcel, Task,
    UnitOfWork, UoWPayload,
};
pub use registry::{Participant, PublisherRegistry, SubscriptionRegistry};
pub use resilience::{
    ConcurrencyMode, FocusStrategy, FocusStrategyRegistry, ResilienceCoordinator, ResilienceMode,
    TaskIdentityContext,
};
pub use state_machine::{ActivityStatus, FinalisationStatus, ProcessingStatus, TaskOutcomeStatus};
pub use system_context::{Collaborators, SystemContext};
