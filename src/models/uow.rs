//! # Unit of Work
//!
//! One message instance flowing through the pipeline: an ingress payload, the
//! egress payloads produced by processing, and the processing outcome.
//!
//! Once a final outcome is recorded the unit of work is immutable; the only way
//! to set egress content is [`UnitOfWork::record_outcome`], which the owning
//! parcel calls on behalf of the WUP.

use super::manifest::DataManifest;
use crate::identity::{Fdn, Rdn};
use crate::state_machine::{StateMachineError, StateMachineResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Qualifier used for generated unit-of-work instance identifiers
pub const UOW_INSTANCE_QUALIFIER: &str = "uow";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UoWProcessingOutcome {
    #[default]
    NotStarted,
    Incomplete,
    Success,
    Failed,
    NoProcessingRequired,
}

impl UoWProcessingOutcome {
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            Self::Success | Self::Failed | Self::NoProcessingRequired
        )
    }
}

impl fmt::Display for UoWProcessingOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not_started"),
            Self::Incomplete => write!(f, "incomplete"),
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
            Self::NoProcessingRequired => write!(f, "no_processing_required"),
        }
    }
}

/// A manifest plus opaque content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UoWPayload {
    pub manifest: Option<DataManifest>,
    pub content: Option<String>,
}

impl UoWPayload {
    pub fn new(manifest: DataManifest, content: impl Into<String>) -> Self {
        Self {
            manifest: Some(manifest),
            content: Some(content.into()),
        }
    }

    /// True when there is both a manifest and non-empty content to route
    pub fn is_routable(&self) -> bool {
        self.manifest.is_some() && self.content.as_deref().is_some_and(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitOfWork {
    instance_id: Fdn,
    type_id: Fdn,
    ingress: Option<UoWPayload>,
    egress: Vec<UoWPayload>,
    outcome: UoWProcessingOutcome,
    failure_description: Option<String>,
}

impl UnitOfWork {
    /// Create a unit of work with a generated instance identifier
    pub fn new(type_id: Fdn, ingress: UoWPayload) -> Self {
        let instance_id = Fdn::from_rdns(vec![Rdn::constant(
            UOW_INSTANCE_QUALIFIER,
            Uuid::new_v4().to_string(),
        )]);
        Self::with_instance_id(instance_id, type_id, Some(ingress))
    }

    pub fn with_instance_id(instance_id: Fdn, type_id: Fdn, ingress: Option<UoWPayload>) -> Self {
        Self {
            instance_id,
            type_id,
            ingress,
            egress: Vec::new(),
            outcome: UoWProcessingOutcome::NotStarted,
            failure_description: None,
        }
    }

    pub fn instance_id(&self) -> &Fdn {
        &self.instance_id
    }

    pub fn type_id(&self) -> &Fdn {
        &self.type_id
    }

    pub fn ingress(&self) -> Option<&UoWPayload> {
        self.ingress.as_ref()
    }

    pub fn ingress_mut(&mut self) -> Option<&mut UoWPayload> {
        self.ingress.as_mut()
    }

    pub fn egress(&self) -> &[UoWPayload] {
        &self.egress
    }

    pub fn outcome(&self) -> UoWProcessingOutcome {
        self.outcome
    }

    pub fn failure_description(&self) -> Option<&str> {
        self.failure_description.as_deref()
    }

    /// Manifest of the ingress payload, if any
    pub fn manifest(&self) -> Option<&DataManifest> {
        self.ingress.as_ref().and_then(|p| p.manifest.as_ref())
    }

    /// Record egress content and outcome; rejected once a final outcome exists
    pub fn record_outcome(
        &mut self,
        egress: Vec<UoWPayload>,
        outcome: UoWProcessingOutcome,
    ) -> StateMachineResult<()> {
        self.ensure_open()?;
        self.egress = egress;
        self.outcome = outcome;
        Ok(())
    }

    /// Mark the unit of work failed with a description
    pub fn record_failure(&mut self, description: impl Into<String>) -> StateMachineResult<()> {
        self.ensure_open()?;
        self.outcome = UoWProcessingOutcome::Failed;
        self.failure_description = Some(description.into());
        Ok(())
    }

    fn ensure_open(&self) -> StateMachineResult<()> {
        if self.outcome.is_final() {
            return Err(StateMachineError::OutcomeAlreadySet {
                outcome: self.outcome.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uow() -> UnitOfWork {
        let manifest = DataManifest::new(Fdn::new("resource", "Observation").unwrap(), "1");
        UnitOfWork::new(
            Fdn::new("uow-type", "observation").unwrap(),
            UoWPayload::new(manifest, "{}"),
        )
    }

    #[test]
    fn test_generated_instance_ids_are_unique() {
        let a = uow();
        let b = uow();
        assert_ne!(a.instance_id(), b.instance_id());
        assert!(a.instance_id().value_of(UOW_INSTANCE_QUALIFIER).is_some());
    }

    #[test]
    fn test_outcome_is_immutable_once_final() {
        let mut work = uow();
        work.record_outcome(vec![], UoWProcessingOutcome::Incomplete)
            .unwrap();
        work.record_outcome(vec![UoWPayload::default()], UoWProcessingOutcome::Success)
            .unwrap();
        assert_eq!(work.egress().len(), 1);

        let err = work
            .record_failure("late failure")
            .expect_err("final outcome must not change");
        assert!(matches!(err, StateMachineError::OutcomeAlreadySet { .. }));
        assert_eq!(work.outcome(), UoWProcessingOutcome::Success);
    }

    #[test]
    fn test_routable_payload() {
        assert!(uow().ingress().unwrap().is_routable());
        assert!(!UoWPayload::default().is_routable());
        let empty = UoWPayload {
            manifest: uow().manifest().cloned(),
            content: Some(String::new()),
        };
        assert!(!empty.is_routable());
    }
}
