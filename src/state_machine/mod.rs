// Processing-status lattice and the status enums carried by parcels, job cards,
// oversight tasks and actionable tasks.

pub mod errors;
pub mod states;

pub use errors::{StateMachineError, StateMachineResult};
pub use states::{
    ActivityStatus, FinalisationStatus, OversightStatus, ProcessingStatus, TaskOutcomeStatus,
};
