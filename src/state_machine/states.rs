use serde::{Deserialize, Serialize};
use std::fmt;

/// Parcel processing status
///
/// Statuses form a lattice ordered by [`ProcessingStatus::rank`]:
///
/// ```text
/// Registered < Initiated < Active | ActiveElsewhere
///            < Finished | Failed | Cancelled (and *Elsewhere)
///            < Finalised | FinalisedElsewhere
/// ```
///
/// The `*Elsewhere` variants are recorded on replicas that are not the
/// authoritative executor for the parcel's episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    /// Parcel exists but no work has been requested
    #[default]
    Registered,
    /// Work has been handed to the WUP but not yet started
    Initiated,
    /// The authoritative replica is executing the work
    Active,
    /// Another replica is executing the work
    ActiveElsewhere,
    Finished,
    FinishedElsewhere,
    Failed,
    FailedElsewhere,
    Cancelled,
    CancelledElsewhere,
    /// All downstream bookkeeping is complete
    Finalised,
    FinalisedElsewhere,
}

impl ProcessingStatus {
    /// Position in the status lattice
    pub fn rank(&self) -> u8 {
        match self {
            Self::Registered => 0,
            Self::Initiated => 1,
            Self::Active | Self::ActiveElsewhere => 2,
            Self::Finished
            | Self::FinishedElsewhere
            | Self::Failed
            | Self::FailedElsewhere
            | Self::Cancelled
            | Self::CancelledElsewhere => 3,
            Self::Finalised | Self::FinalisedElsewhere => 4,
        }
    }

    /// Terminal statuses are eligible for eviction by the cache sweep
    pub fn is_terminal(&self) -> bool {
        self.rank() >= 3
    }

    /// Statuses reported by `list_in_progress`
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::Registered | Self::Initiated | Self::Active)
    }

    pub fn is_elsewhere(&self) -> bool {
        matches!(
            self,
            Self::ActiveElsewhere
                | Self::FinishedElsewhere
                | Self::FailedElsewhere
                | Self::CancelledElsewhere
                | Self::FinalisedElsewhere
        )
    }

    /// The `*Elsewhere` counterpart; statuses without one are returned as-is
    pub fn elsewhere(self) -> Self {
        match self {
            Self::Active => Self::ActiveElsewhere,
            Self::Finished => Self::FinishedElsewhere,
            Self::Failed => Self::FailedElsewhere,
            Self::Cancelled => Self::CancelledElsewhere,
            Self::Finalised => Self::FinalisedElsewhere,
            other => other,
        }
    }

    /// Check whether moving from `self` to `next` keeps the status monotonic
    ///
    /// Re-asserting the current status is allowed. Within the active rank a
    /// parcel may switch between `Active` and `ActiveElsewhere` when focus moves;
    /// terminal statuses never change sideways.
    pub fn can_transition_to(&self, next: ProcessingStatus) -> bool {
        if *self == next {
            return true;
        }
        match self.rank().cmp(&next.rank()) {
            std::cmp::Ordering::Less => true,
            std::cmp::Ordering::Equal => self.rank() == 2,
            std::cmp::Ordering::Greater => false,
        }
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Registered => "registered",
            Self::Initiated => "initiated",
            Self::Active => "active",
            Self::ActiveElsewhere => "active_elsewhere",
            Self::Finished => "finished",
            Self::FinishedElsewhere => "finished_elsewhere",
            Self::Failed => "failed",
            Self::FailedElsewhere => "failed_elsewhere",
            Self::Cancelled => "cancelled",
            Self::CancelledElsewhere => "cancelled_elsewhere",
            Self::Finalised => "finalised",
            Self::FinalisedElsewhere => "finalised_elsewhere",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for ProcessingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registered" => Ok(Self::Registered),
            "initiated" => Ok(Self::Initiated),
            "active" => Ok(Self::Active),
            "active_elsewhere" => Ok(Self::ActiveElsewhere),
            "finished" => Ok(Self::Finished),
            "finished_elsewhere" => Ok(Self::FinishedElsewhere),
            "failed" => Ok(Self::Failed),
            "failed_elsewhere" => Ok(Self::FailedElsewhere),
            "cancelled" => Ok(Self::Cancelled),
            "cancelled_elsewhere" => Ok(Self::CancelledElsewhere),
            "finalised" => Ok(Self::Finalised),
            "finalised_elsewhere" => Ok(Self::FinalisedElsewhere),
            _ => Err(format!("Invalid processing status: {s}")),
        }
    }
}

/// Parcel finalisation bookkeeping status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FinalisationStatus {
    #[default]
    NotFinalised,
    Finalised,
    FinalisedElsewhere,
}

/// Execution status carried on a job card (requested and granted)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    #[default]
    Waiting,
    Executing,
    Finished,
    Failed,
    Cancelled,
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::Executing => write!(f, "executing"),
            Self::Finished => write!(f, "finished"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Aggregate status of an oversight task across its fulfillment attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OversightStatus {
    /// No fulfillment task has been assigned yet
    #[default]
    Unassigned,
    /// At least one attempt is registered or running
    InProgress,
    /// An attempt finished successfully
    Fulfilled,
    /// Every attempt failed
    Failed,
    /// Every attempt was cancelled
    Cancelled,
}

/// Outcome tracked on an actionable task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcomeStatus {
    #[default]
    Unknown,
    Active,
    Finished,
    Failed,
    Cancelled,
}
