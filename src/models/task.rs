//! # Tasks
//!
//! All task flavours share one [`TaskCore`] (identity, work item, traceability)
//! and are carried in the tagged [`Task`] enum:
//!
//! - [`ActionableTask`]: a unit of work that is ready to be routed downstream
//! - [`FulfillmentTask`]: one execution attempt by one WUP instance (a parcel)
//! - [`OversightTask`]: tracks every fulfillment attempt of an actionable task

use super::fulfillment_task::FulfillmentTask;
use super::oversight_task::OversightTask;
use super::traceability::{TaskTraceability, TaskTraceabilityElement};
use super::uow::{UnitOfWork, UoWPayload, UoWProcessingOutcome};
use crate::identity::Fdn;
use crate::state_machine::{StateMachineResult, TaskOutcomeStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity, work item and traceability shared by every task flavour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskCore {
    pub id: Fdn,
    pub work_item: Option<UnitOfWork>,
    pub traceability: TaskTraceability,
    pub created_at: DateTime<Utc>,
}

impl TaskCore {
    pub fn new(id: Fdn, work_item: Option<UnitOfWork>) -> Self {
        Self {
            id,
            work_item,
            traceability: TaskTraceability::new(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionableTask {
    pub core: TaskCore,
    /// Episode that produced this task
    pub episode_id: Option<Fdn>,
    /// Function of the WUP that produced this task
    pub wup_function_id: Option<Fdn>,
    /// Parcel whose work produced this task
    #[serde(default)]
    pub producing_parcel_id: Option<Fdn>,
    /// Follows the work item's processing outcome
    pub outcome_status: TaskOutcomeStatus,
}

impl ActionableTask {
    pub fn new(id: Fdn, work_item: UnitOfWork) -> Self {
        let outcome_status = outcome_status_of(work_item.outcome());
        Self {
            core: TaskCore::new(id, Some(work_item)),
            episode_id: None,
            wup_function_id: None,
            producing_parcel_id: None,
            outcome_status,
        }
    }

    /// Actionable task carrying a parcel's work downstream
    ///
    /// Returns `None` when the parcel has no work item.
    pub fn from_parcel(id: Fdn, parcel: &FulfillmentTask) -> Option<Self> {
        let uow = parcel.uow()?.clone();
        Some(
            Self::new(id, uow)
                .with_episode(parcel.episode_id().clone())
                .with_wup_function(parcel.wup_function_id().clone())
                .with_producing_parcel(parcel.id().clone())
                .with_traceability(parcel.core.traceability.clone()),
        )
    }

    pub fn with_episode(mut self, episode_id: Fdn) -> Self {
        self.episode_id = Some(episode_id);
        self
    }

    pub fn with_wup_function(mut self, wup_function_id: Fdn) -> Self {
        self.wup_function_id = Some(wup_function_id);
        self
    }

    pub fn with_producing_parcel(mut self, parcel_id: Fdn) -> Self {
        self.producing_parcel_id = Some(parcel_id);
        self
    }

    pub fn with_traceability(mut self, traceability: TaskTraceability) -> Self {
        self.core.traceability = traceability;
        self
    }

    pub fn id(&self) -> &Fdn {
        &self.core.id
    }

    /// Record the work item's egress and outcome, keeping `outcome_status` in step
    pub fn record_outcome(
        &mut self,
        egress: Vec<UoWPayload>,
        outcome: UoWProcessingOutcome,
    ) -> StateMachineResult<()> {
        let Some(uow) = self.core.work_item.as_mut() else {
            return Ok(());
        };
        uow.record_outcome(egress, outcome)?;
        self.outcome_status = outcome_status_of(outcome);
        Ok(())
    }

    pub fn work_item(&self) -> Option<&UnitOfWork> {
        self.core.work_item.as_ref()
    }

    pub fn traceability(&self) -> &TaskTraceability {
        &self.core.traceability
    }

    /// Journey element describing this task, for appending to downstream tasks
    pub fn summary(&self) -> TaskTraceabilityElement {
        TaskTraceabilityElement {
            task_id: self.core.id.clone(),
            wup_function_id: self.wup_function_id.clone(),
            recorded_at: Utc::now(),
        }
    }
}

fn outcome_status_of(outcome: UoWProcessingOutcome) -> TaskOutcomeStatus {
    match outcome {
        UoWProcessingOutcome::NotStarted => TaskOutcomeStatus::Unknown,
        UoWProcessingOutcome::Incomplete => TaskOutcomeStatus::Active,
        UoWProcessingOutcome::Success | UoWProcessingOutcome::NoProcessingRequired => {
            TaskOutcomeStatus::Finished
        }
        UoWProcessingOutcome::Failed => TaskOutcomeStatus::Failed,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Actionable,
    Fulfillment,
    Oversight,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Actionable => write!(f, "actionable"),
            Self::Fulfillment => write!(f, "fulfillment"),
            Self::Oversight => write!(f, "oversight"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task_kind", rename_all = "snake_case")]
pub enum Task {
    Actionable(ActionableTask),
    Fulfillment(FulfillmentTask),
    Oversight(OversightTask),
}

impl Task {
    pub fn core(&self) -> &TaskCore {
        match self {
            Task::Actionable(task) => &task.core,
            Task::Fulfillment(task) => &task.core,
            Task::Oversight(task) => &task.core,
        }
    }

    pub fn id(&self) -> &Fdn {
        &self.core().id
    }

    pub fn kind(&self) -> TaskKind {
        match self {
            Task::Actionable(_) => TaskKind::Actionable,
            Task::Fulfillment(_) => TaskKind::Fulfillment,
            Task::Oversight(_) => TaskKind::Oversight,
        }
    }
}

impl From<ActionableTask> for Task {
    fn from(task: ActionableTask) -> Self {
        Task::Actionable(task)
    }
}

impl From<FulfillmentTask> for Task {
    fn from(task: FulfillmentTask) -> Self {
        Task::Fulfillment(task)
    }
}

impl From<OversightTask> for Task {
    fn from(task: OversightTask) -> Self {
        Task::Oversight(task)
    }
}
