//! # Fulfillment Task (Parcel)
//!
//! One execution attempt of one unit of work by one WUP instance. Identity is
//! derived: the parcel identifier is the WUP-instance FDN with the UoW-instance
//! FDN appended, so registering the same pair twice yields the same key.
//!
//! Processing status only moves forward along the lattice defined by
//! [`ProcessingStatus`]; every transition stamps the matching milestone
//! timestamp.

use super::task::TaskCore;
use super::traceability::TaskTraceability;
use super::uow::{UnitOfWork, UoWPayload, UoWProcessingOutcome};
use crate::identity::{self, Fdn};
use crate::state_machine::{
    FinalisationStatus, ProcessingStatus, StateMachineError, StateMachineResult,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A parcel is the fulfillment task of the unified task model
pub type Parcel = FulfillmentTask;

/// Lifecycle milestones of a parcel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParcelTimestamps {
    pub registration: DateTime<Utc>,
    pub start: Option<DateTime<Utc>>,
    pub finished: Option<DateTime<Utc>>,
    pub finalisation: Option<DateTime<Utc>>,
    pub cancellation: Option<DateTime<Utc>>,
    pub last_update: DateTime<Utc>,
}

impl ParcelTimestamps {
    fn new(at: DateTime<Utc>) -> Self {
        Self {
            registration: at,
            start: None,
            finished: None,
            finalisation: None,
            cancellation: None,
            last_update: at,
        }
    }

    /// Latest of the finalisation, cancellation and finished dates
    pub fn end_date(&self) -> Option<DateTime<Utc>> {
        [self.finalisation, self.cancellation, self.finished]
            .into_iter()
            .flatten()
            .max()
    }
}

/// Transport port a parcel arrived on or is addressed to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportPortMetadata {
    pub endpoint: String,
    pub protocol: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FulfillmentTask {
    pub core: TaskCore,
    type_id: Fdn,
    episode_id: Fdn,
    upstream_episode_id: Option<Fdn>,
    downstream_episode_ids: BTreeSet<Fdn>,
    wup_instance_id: Fdn,
    wup_function_id: Fdn,
    actionable_task_id: Option<Fdn>,
    processing_status: ProcessingStatus,
    finalisation_status: FinalisationStatus,
    timestamps: ParcelTimestamps,
    port: Option<TransportPortMetadata>,
}

impl FulfillmentTask {
    /// Build a freshly registered parcel with derived identities
    pub fn register(
        wup_instance_id: Fdn,
        wup_function_id: Fdn,
        uow: UnitOfWork,
        upstream_episode_id: Option<Fdn>,
        at: DateTime<Utc>,
    ) -> Self {
        let id = identity::parcel_id(&wup_instance_id, uow.instance_id());
        let type_id = identity::parcel_type_id(&wup_function_id, uow.type_id());
        let episode_id = identity::episode_id(&wup_function_id, uow.instance_id());
        let mut core = TaskCore::new(id, Some(uow));
        core.created_at = at;

        Self {
            core,
            type_id,
            episode_id,
            upstream_episode_id,
            downstream_episode_ids: BTreeSet::new(),
            wup_instance_id,
            wup_function_id,
            actionable_task_id: None,
            processing_status: ProcessingStatus::Registered,
            finalisation_status: FinalisationStatus::NotFinalised,
            timestamps: ParcelTimestamps::new(at),
            port: None,
        }
    }

    pub fn with_actionable_task(mut self, actionable_task_id: Fdn) -> Self {
        self.actionable_task_id = Some(actionable_task_id);
        self
    }

    pub fn with_traceability(mut self, traceability: TaskTraceability) -> Self {
        self.core.traceability = traceability;
        self
    }

    pub fn with_port(mut self, port: TransportPortMetadata) -> Self {
        self.port = Some(port);
        self
    }

    pub fn id(&self) -> &Fdn {
        &self.core.id
    }

    pub fn type_id(&self) -> &Fdn {
        &self.type_id
    }

    pub fn episode_id(&self) -> &Fdn {
        &self.episode_id
    }

    pub fn upstream_episode_id(&self) -> Option<&Fdn> {
        self.upstream_episode_id.as_ref()
    }

    pub fn downstream_episode_ids(&self) -> &BTreeSet<Fdn> {
        &self.downstream_episode_ids
    }

    pub fn wup_instance_id(&self) -> &Fdn {
        &self.wup_instance_id
    }

    pub fn wup_function_id(&self) -> &Fdn {
        &self.wup_function_id
    }

    pub fn actionable_task_id(&self) -> Option<&Fdn> {
        self.actionable_task_id.as_ref()
    }

    pub fn uow(&self) -> Option<&UnitOfWork> {
        self.core.work_item.as_ref()
    }

    pub fn uow_mut(&mut self) -> Option<&mut UnitOfWork> {
        self.core.work_item.as_mut()
    }

    pub fn uow_type_id(&self) -> Option<&Fdn> {
        self.uow().map(UnitOfWork::type_id)
    }

    pub fn processing_status(&self) -> ProcessingStatus {
        self.processing_status
    }

    pub fn finalisation_status(&self) -> FinalisationStatus {
        self.finalisation_status
    }

    pub fn timestamps(&self) -> &ParcelTimestamps {
        &self.timestamps
    }

    pub fn port(&self) -> Option<&TransportPortMetadata> {
        self.port.as_ref()
    }

    pub fn add_downstream_episode(&mut self, episode_id: Fdn) {
        self.downstream_episode_ids.insert(episode_id);
    }

    /// Move to `next`, stamping the milestone that status represents
    pub fn transition_to(
        &mut self,
        next: ProcessingStatus,
        at: DateTime<Utc>,
    ) -> StateMachineResult<()> {
        if !self.processing_status.can_transition_to(next) {
            return Err(StateMachineError::InvalidTransition {
                from: self.processing_status,
                to: next,
            });
        }

        match next {
            ProcessingStatus::Registered | ProcessingStatus::Initiated => {}
            ProcessingStatus::Active | ProcessingStatus::ActiveElsewhere => {
                self.timestamps.start.get_or_insert(at);
            }
            ProcessingStatus::Finished
            | ProcessingStatus::FinishedElsewhere
            | ProcessingStatus::Failed
            | ProcessingStatus::FailedElsewhere => {
                self.timestamps.finished.get_or_insert(at);
            }
            ProcessingStatus::Cancelled | ProcessingStatus::CancelledElsewhere => {
                self.timestamps.cancellation.get_or_insert(at);
            }
            ProcessingStatus::Finalised => {
                self.timestamps.finalisation.get_or_insert(at);
                self.finalisation_status = FinalisationStatus::Finalised;
            }
            ProcessingStatus::FinalisedElsewhere => {
                self.timestamps.finalisation.get_or_insert(at);
                self.finalisation_status = FinalisationStatus::FinalisedElsewhere;
            }
        }

        self.processing_status = next;
        self.timestamps.last_update = at;
        Ok(())
    }

    /// Record egress payloads and outcome on the owned unit of work
    pub fn record_outcome(
        &mut self,
        egress: Vec<UoWPayload>,
        outcome: UoWProcessingOutcome,
    ) -> StateMachineResult<()> {
        match self.core.work_item.as_mut() {
            Some(uow) => uow.record_outcome(egress, outcome),
            None => Ok(()),
        }
    }

    /// Record a failure description on the owned unit of work
    pub fn record_failure(&mut self, description: &str) -> StateMachineResult<()> {
        match self.core.work_item.as_mut() {
            Some(uow) => uow.record_failure(description),
            None => Ok(()),
        }
    }

    /// Replace the unit of work with the one a WUP reports on completion
    ///
    /// The instance identity must not change; a different unit of work is a
    /// different parcel.
    pub fn replace_uow(&mut self, uow: UnitOfWork) -> bool {
        match self.uow() {
            Some(current) if current.instance_id() != uow.instance_id() => false,
            _ => {
                self.core.work_item = Some(uow);
                true
            }
        }
    }

    /// Stamp a cancellation date without changing status
    pub fn stamp_cancellation(&mut self, at: DateTime<Utc>) {
        self.timestamps.cancellation = Some(at);
        self.timestamps.last_update = at;
    }

    /// Latest end date, if the parcel has one
    pub fn end_date(&self) -> Option<DateTime<Utc>> {
        self.timestamps.end_date()
    }

    /// Time elapsed since the end date
    pub fn age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.end_date().map(|end| now - end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::manifest::DataManifest;

    fn parcel() -> FulfillmentTask {
        let manifest = DataManifest::new(Fdn::new("resource", "Patient").unwrap(), "1");
        let uow = UnitOfWork::with_instance_id(
            Fdn::new("uow", "u-1").unwrap(),
            Fdn::new("uow-type", "adt").unwrap(),
            Some(UoWPayload::new(manifest, "{}")),
        );
        FulfillmentTask::register(
            Fdn::from_token("[node=a][wup=ingest][instance=1]").unwrap(),
            Fdn::new("wup", "ingest").unwrap().with_version("1.0"),
            uow,
            None,
            Utc::now(),
        )
    }

    #[test]
    fn test_register_derives_identities() {
        let parcel = parcel();
        assert_eq!(
            parcel.id().token(),
            "[node=a][wup=ingest][instance=1][uow=u-1]"
        );
        assert_eq!(
            parcel.type_id().token(),
            "[wup=ingest][version=1.0][uow-type=adt]"
        );
        assert_eq!(parcel.episode_id().token(), "[wup=ingest][version=1.0][uow=u-1]");
        assert_eq!(parcel.processing_status(), ProcessingStatus::Registered);
        assert!(parcel.end_date().is_none());
    }

    #[test]
    fn test_transitions_stamp_milestones() {
        let mut parcel = parcel();
        let start = Utc::now();
        parcel.transition_to(ProcessingStatus::Active, start).unwrap();
        assert_eq!(parcel.timestamps().start, Some(start));

        let finish = start + Duration::seconds(5);
        parcel.transition_to(ProcessingStatus::Finished, finish).unwrap();
        assert_eq!(parcel.end_date(), Some(finish));

        let finalised = finish + Duration::seconds(5);
        parcel.transition_to(ProcessingStatus::Finalised, finalised).unwrap();
        assert_eq!(parcel.finalisation_status(), FinalisationStatus::Finalised);
        assert_eq!(parcel.end_date(), Some(finalised));
        assert_eq!(
            parcel.age(finalised + Duration::seconds(30)),
            Some(Duration::seconds(30))
        );
    }

    #[test]
    fn test_terminal_status_is_never_reopened() {
        let mut parcel = parcel();
        parcel.transition_to(ProcessingStatus::Failed, Utc::now()).unwrap();
        let err = parcel
            .transition_to(ProcessingStatus::Active, Utc::now())
            .unwrap_err();
        assert_eq!(
            err,
            StateMachineError::InvalidTransition {
                from: ProcessingStatus::Failed,
                to: ProcessingStatus::Active,
            }
        );
        assert_eq!(parcel.processing_status(), ProcessingStatus::Failed);
    }

    #[test]
    fn test_replace_uow_keeps_instance_identity() {
        let mut parcel = parcel();
        let mut same = parcel.uow().unwrap().clone();
        same.record_outcome(vec![], UoWProcessingOutcome::Success).unwrap();
        assert!(parcel.replace_uow(same));
        assert_eq!(parcel.uow().unwrap().outcome(), UoWProcessingOutcome::Success);

        let other = UnitOfWork::with_instance_id(
            Fdn::new("uow", "u-2").unwrap(),
            Fdn::new("uow-type", "adt").unwrap(),
            None,
        );
        assert!(!parcel.replace_uow(other));
    }
}
