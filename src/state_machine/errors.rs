use super::states::ProcessingStatus;
use thiserror::Error;

/// Errors raised by parcel and unit-of-work state changes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateMachineError {
    #[error("Invalid processing status transition from {from} to {to}")]
    InvalidTransition {
        from: ProcessingStatus,
        to: ProcessingStatus,
    },

    #[error("Unit of work outcome already set to {outcome}")]
    OutcomeAlreadySet { outcome: String },
}

pub type StateMachineResult<T> = Result<T, StateMachineError>;
