use crate::identity::Fdn;
use crate::state_machine::ActivityStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Execution request a WUP instance hands to the coordinator
///
/// The WUP sets `requested_status`; the coordinator answers by writing
/// `granted_status` once the request is permitted for this replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCard {
    pub parcel_id: Fdn,
    pub episode_id: Fdn,
    pub wup_instance_id: Fdn,
    pub requested_status: ActivityStatus,
    pub granted_status: ActivityStatus,
    pub is_to_be_discarded: bool,
    pub update_date: DateTime<Utc>,
}

impl JobCard {
    pub fn new(parcel_id: Fdn, episode_id: Fdn, wup_instance_id: Fdn) -> Self {
        Self {
            parcel_id,
            episode_id,
            wup_instance_id,
            requested_status: ActivityStatus::Waiting,
            granted_status: ActivityStatus::Waiting,
            is_to_be_discarded: false,
            update_date: Utc::now(),
        }
    }

    pub fn request(mut self, status: ActivityStatus) -> Self {
        self.requested_status = status;
        self
    }

    pub fn is_granted(&self) -> bool {
        self.requested_status == self.granted_status
    }
}
