//! Error types for the task orchestration core.

use crate::identity::{Fdn, IdentifierError};
use crate::state_machine::StateMachineError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskmeshError {
    /// A caller broke a contract: missing identifiers, unknown topology,
    /// empty episode parcel sets. Never retried.
    #[error("Contract violation: {0}")]
    ContractViolation(String),
    #[error("Identifier format error: {0}")]
    Format(#[from] IdentifierError),
    #[error("{entity} not found: {identifier}")]
    NotFound { entity: &'static str, identifier: String },
    #[error("State transition error: {0}")]
    StateTransition(#[from] StateMachineError),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Audit error: {0}")]
    Audit(String),
}

impl TaskmeshError {
    pub fn contract(msg: impl Into<String>) -> Self {
        Self::ContractViolation(msg.into())
    }

    pub fn parcel_not_found(id: &Fdn) -> Self {
        Self::NotFound {
            entity: "Parcel",
            identifier: id.to_string(),
        }
    }

    pub fn episode_not_found(id: &Fdn) -> Self {
        Self::NotFound {
            entity: "Episode",
            identifier: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<config::ConfigError> for TaskmeshError {
    fn from(err: config::ConfigError) -> Self {
        TaskmeshError::Configuration(err.to_string())
    }
}

pub type TaskmeshResult<T> = Result<T, TaskmeshError>;
