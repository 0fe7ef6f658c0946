use super::fulfillment_task::FulfillmentTask;
use super::task::{ActionableTask, TaskCore};
use crate::identity::Fdn;
use crate::state_machine::{OversightStatus, ProcessingStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tracks who is currently attempting to fulfill an actionable task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OversightTask {
    pub core: TaskCore,
    pub actionable_task_id: Fdn,
    fulfillments: BTreeMap<Fdn, FulfillmentTask>,
    status: OversightStatus,
}

impl OversightTask {
    pub fn for_actionable(id: Fdn, actionable: &ActionableTask) -> Self {
        let mut core = TaskCore::new(id, actionable.core.work_item.clone());
        core.traceability = actionable.core.traceability.clone();
        Self {
            core,
            actionable_task_id: actionable.id().clone(),
            fulfillments: BTreeMap::new(),
            status: OversightStatus::Unassigned,
        }
    }

    pub fn status(&self) -> OversightStatus {
        self.status
    }

    pub fn fulfillments(&self) -> impl Iterator<Item = &FulfillmentTask> {
        self.fulfillments.values()
    }

    pub fn fulfillment(&self, id: &Fdn) -> Option<&FulfillmentTask> {
        self.fulfillments.get(id)
    }

    /// Track a new fulfillment attempt (replacing one with the same id)
    pub fn add_fulfillment(&mut self, task: FulfillmentTask) -> OversightStatus {
        self.fulfillments.insert(task.id().clone(), task);
        self.recompute_status()
    }

    /// Replace the snapshot of a tracked attempt; returns `None` if untracked
    pub fn update_fulfillment(&mut self, task: FulfillmentTask) -> Option<OversightStatus> {
        let slot = self.fulfillments.get_mut(task.id())?;
        *slot = task;
        Some(self.recompute_status())
    }

    pub fn remove_fulfillment(&mut self, id: &Fdn) -> Option<FulfillmentTask> {
        let removed = self.fulfillments.remove(id);
        self.recompute_status();
        removed
    }

    /// Derive the aggregate status from the tracked attempts
    ///
    /// A successful attempt wins; otherwise any live attempt keeps the task in
    /// progress; otherwise failures take precedence over cancellations.
    pub fn recompute_status(&mut self) -> OversightStatus {
        let statuses: Vec<ProcessingStatus> = self
            .fulfillments
            .values()
            .map(FulfillmentTask::processing_status)
            .collect();

        self.status = if statuses.is_empty() {
            OversightStatus::Unassigned
        } else if statuses.iter().any(|s| {
            matches!(
                s,
                ProcessingStatus::Finished
                    | ProcessingStatus::FinishedElsewhere
                    | ProcessingStatus::Finalised
                    | ProcessingStatus::FinalisedElsewhere
            )
        }) {
            OversightStatus::Fulfilled
        } else if statuses.iter().any(|s| !s.is_terminal()) {
            OversightStatus::InProgress
        } else if statuses
            .iter()
            .any(|s| matches!(s, ProcessingStatus::Failed | ProcessingStatus::FailedElsewhere))
        {
            OversightStatus::Failed
        } else {
            OversightStatus::Cancelled
        };
        self.status
    }
}
