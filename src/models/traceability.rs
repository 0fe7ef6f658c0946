use crate::identity::Fdn;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary of one upstream task in a traceability journey
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTraceabilityElement {
    pub task_id: Fdn,
    pub wup_function_id: Option<Fdn>,
    pub recorded_at: DateTime<Utc>,
}

/// Ordered, append-only history of the upstream tasks that produced a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TaskTraceability {
    journey: Vec<TaskTraceabilityElement>,
}

impl TaskTraceability {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, element: TaskTraceabilityElement) {
        self.journey.push(element);
    }

    pub fn journey(&self) -> &[TaskTraceabilityElement] {
        &self.journey
    }

    /// Most recent upstream task
    pub fn latest(&self) -> Option<&TaskTraceabilityElement> {
        self.journey.last()
    }

    pub fn len(&self) -> usize {
        self.journey.len()
    }

    pub fn is_empty(&self) -> bool {
        self.journey.is_empty()
    }

    /// Whether `task_id` appears anywhere upstream
    pub fn contains(&self, task_id: &Fdn) -> bool {
        self.journey.iter().any(|e| &e.task_id == task_id)
    }
}
