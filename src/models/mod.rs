//! # Data Model
//!
//! Units of work, the unified task model (actionable, fulfillment/parcel,
//! oversight), episodes, traceability journeys and job cards.

pub mod episode;
pub mod fulfillment_task;
pub mod job_card;
pub mod manifest;
pub mod oversight_task;
pub mod task;
pub mod traceability;
pub mod uow;

pub use episode::Episode;
pub use fulfillment_task::{FulfillmentTask, Parcel, ParcelTimestamps, TransportPortMetadata};
pub use job_card::JobCard;
pub use manifest::DataManifest;
pub use oversight_task::OversightTask;
pub use task::{ActionableTask, Task, TaskCore, TaskKind};
pub use traceability::{TaskTraceability, TaskTraceabilityElement};
pub use uow::{UnitOfWork, UoWPayload, UoWProcessingOutcome, UOW_INSTANCE_QUALIFIER};
