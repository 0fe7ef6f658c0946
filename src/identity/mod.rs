//! # Identity
//!
//! Hierarchical FDN/RDN identifiers and the derivation helpers that make parcel,
//! episode and type identities deterministic.

pub mod fdn;

pub use fdn::{Fdn, IdentifierError, IdentifierResult, Rdn, VERSION_QUALIFIER};

/// Parcel identity: WUP-instance FDN ⧺ UoW-instance FDN
pub fn parcel_id(wup_instance_id: &Fdn, uow_instance_id: &Fdn) -> Fdn {
    wup_instance_id.append_fdn(uow_instance_id)
}

/// Parcel type identity: versioned WUP-function FDN ⧺ UoW-type FDN
pub fn parcel_type_id(wup_function_id: &Fdn, uow_type_id: &Fdn) -> Fdn {
    wup_function_id.append_fdn(uow_type_id)
}

/// Episode identity: WUP-function FDN ⧺ UoW-instance FDN
///
/// Deliberately narrower than a grouping by (function, UoW type): each unit of
/// work gets its own episode, so two messages of the same type never share
/// focus. Every replica and retry of the same function working the same unit
/// of work lands in the same episode.
pub fn episode_id(wup_function_id: &Fdn, uow_instance_id: &Fdn) -> Fdn {
    wup_function_id.append_fdn(uow_instance_id)
}
