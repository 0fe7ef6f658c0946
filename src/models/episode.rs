//! # Episodes
//!
//! An episode groups every parcel produced for the same WUP function working
//! the same unit of work, across retries and replicas. It records which
//! replica holds cluster-wide and site-wide focus, which instance is actively
//! executing, and which downstream functions have declared interest in the
//! episode's output.
//!
//! Episodes are created on first parcel registration, mutated by every status
//! notification, and reclaimed by the cache sweep once none of their parcels
//! remain cached.

use crate::identity::Fdn;
use crate::state_machine::{FinalisationStatus, ProcessingStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub id: Fdn,
    pub wup_function_id: Fdn,
    /// WUP instance -> parcel identifier
    parcels: BTreeMap<Fdn, Fdn>,
    pub processing_status: ProcessingStatus,
    pub finalisation_status: FinalisationStatus,
    pub upstream_episode_id: Option<Fdn>,
    pub downstream_episode_ids: BTreeSet<Fdn>,
    pub active_wup_instance: Option<Fdn>,
    pub cluster_focus: Option<Fdn>,
    pub site_focus: Option<Fdn>,
    /// Downstream WUP functions expected to react to this episode's output
    downstream_interests: BTreeSet<Fdn>,
    /// Downstream WUP functions that have reacted
    downstream_reactions: BTreeSet<Fdn>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Episode {
    pub fn new(
        id: Fdn,
        wup_function_id: Fdn,
        upstream_episode_id: Option<Fdn>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            wup_function_id,
            parcels: BTreeMap::new(),
            processing_status: ProcessingStatus::Registered,
            finalisation_status: FinalisationStatus::NotFinalised,
            upstream_episode_id,
            downstream_episode_ids: BTreeSet::new(),
            active_wup_instance: None,
            cluster_focus: None,
            site_focus: None,
            downstream_interests: BTreeSet::new(),
            downstream_reactions: BTreeSet::new(),
            created_at: at,
            updated_at: at,
        }
    }

    /// Record the parcel a WUP instance runs for this episode
    pub fn attach_parcel(&mut self, wup_instance_id: Fdn, parcel_id: Fdn) {
        self.parcels.insert(wup_instance_id, parcel_id);
    }

    pub fn detach_parcel(&mut self, parcel_id: &Fdn) {
        self.parcels.retain(|_, id| id != parcel_id);
    }

    pub fn parcel_for_instance(&self, wup_instance_id: &Fdn) -> Option<&Fdn> {
        self.parcels.get(wup_instance_id)
    }

    pub fn parcel_ids(&self) -> impl Iterator<Item = &Fdn> {
        self.parcels.values()
    }

    pub fn parcel_count(&self) -> usize {
        self.parcels.len()
    }

    pub fn has_cluster_focus(&self, parcel_id: &Fdn) -> bool {
        self.cluster_focus.as_ref() == Some(parcel_id)
    }

    pub fn has_site_focus(&self, parcel_id: &Fdn) -> bool {
        self.site_focus.as_ref() == Some(parcel_id)
    }

    /// Grant focus at the given scopes to `parcel_id`
    pub fn grant_focus(&mut self, parcel_id: &Fdn, cluster: bool, site: bool, at: DateTime<Utc>) {
        if cluster {
            self.cluster_focus = Some(parcel_id.clone());
        }
        if site {
            self.site_focus = Some(parcel_id.clone());
        }
        self.updated_at = at;
    }

    /// Advance episode-level status; regressions are ignored
    pub fn observe_status(&mut self, status: ProcessingStatus, at: DateTime<Utc>) {
        if self.processing_status.can_transition_to(status) {
            self.processing_status = status;
            match status {
                ProcessingStatus::Finalised => {
                    self.finalisation_status = FinalisationStatus::Finalised;
                }
                ProcessingStatus::FinalisedElsewhere => {
                    self.finalisation_status = FinalisationStatus::FinalisedElsewhere;
                }
                _ => {}
            }
        }
        self.updated_at = at;
    }

    pub fn register_downstream_interest(&mut self, wup_function_id: Fdn) -> bool {
        self.downstream_interests.insert(wup_function_id)
    }

    pub fn downstream_interests(&self) -> &BTreeSet<Fdn> {
        &self.downstream_interests
    }

    /// Note that a downstream function reacted; unknown functions are ignored
    pub fn record_downstream_reaction(&mut self, wup_function_id: &Fdn) -> bool {
        if self.downstream_interests.contains(wup_function_id) {
            self.downstream_reactions.insert(wup_function_id.clone())
        } else {
            false
        }
    }

    /// True once every registered downstream interest has reacted
    pub fn all_downstream_reacted(&self) -> bool {
        self.downstream_interests
            .iter()
            .all(|f| self.downstream_reactions.contains(f))
    }
}
