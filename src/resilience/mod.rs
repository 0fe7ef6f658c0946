//! # Resilience Module
//!
//! Focus management for replicated WUPs and the coordinator that registers
//! parcels and applies their status notifications.
//!
//! ## Architecture
//!
//! - **Modes**: resilience and concurrency modes declared per WUP in the topology directory
//! - **Focus strategies**: pluggable grant logic keyed by the mode pair
//! - **Coordinator**: parcel registration, job-card synchronisation, lifecycle notifications
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use taskmesh_core::cache::TaskCache;
//! use taskmesh_core::collaborators::{InMemoryTopologyDirectory, TracingAuditSink};
//! use taskmesh_core::resilience::{FocusStrategyRegistry, ResilienceCoordinator, TaskIdentityContext};
//! # use taskmesh_core::identity::Fdn;
//! # use taskmesh_core::models::UnitOfWork;
//!
//! # async fn example(wup: Fdn, uow: UnitOfWork) -> Result<(), Box<dyn std::error::Error>> {
//! let coordinator = ResilienceCoordinator::new(
//!     Arc::new(TaskCache::default()),
//!     Arc::new(InMemoryTopologyDirectory::new()),
//!     FocusStrategyRegistry::default(),
//!     Arc::new(TracingAuditSink),
//! );
//!
//! let registration = coordinator
//!     .register_new_work_unit_activity(TaskIdentityContext::new(wup, uow))
//!     .await?;
//! coordinator.notify_start(registration.parcel.id()).await?;
//! # Ok(())
//! # }
//! ```

pub mod coordinator;
pub mod focus;
pub mod modes;

pub use coordinator::{ParcelRegistration, ResilienceCoordinator, TaskIdentityContext};
pub use focus::{
    DeferredFocusStrategy, EpisodeFocusView, FocusDecision, FocusStrategy,
    FocusStrategyRegistry, JobCardSynchronisation, StandaloneFocusStrategy,
};
pub use modes::{ConcurrencyMode, ModePair, ResilienceMode};
