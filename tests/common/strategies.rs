#![allow(dead_code)]

use proptest::prelude::*;
use taskmesh_core::{ProcessingStatus, Rdn};

/// Qualifiers, including the characters the token format must escape
pub fn qualifier_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_\\-\\[\\]=\\\\]{1,12}"
}

/// Values of any printable text, possibly empty
pub fn value_strategy() -> impl Strategy<Value = String> {
    "\\PC{0,16}"
}

pub fn rdn_strategy() -> impl Strategy<Value = Rdn> {
    (qualifier_strategy(), value_strategy())
        .prop_map(|(q, v)| Rdn::new(q, v).expect("non-empty qualifier"))
}

pub fn rdn_sequence_strategy() -> impl Strategy<Value = Vec<Rdn>> {
    prop::collection::vec(rdn_strategy(), 0..8)
}

pub fn processing_status_strategy() -> impl Strategy<Value = ProcessingStatus> {
    prop_oneof![
        Just(ProcessingStatus::Registered),
        Just(ProcessingStatus::Initiated),
        Just(ProcessingStatus::Active),
        Just(ProcessingStatus::ActiveElsewhere),
        Just(ProcessingStatus::Finished),
        Just(ProcessingStatus::FinishedElsewhere),
        Just(ProcessingStatus::Failed),
        Just(ProcessingStatus::FailedElsewhere),
        Just(ProcessingStatus::Cancelled),
        Just(ProcessingStatus::CancelledElsewhere),
        Just(ProcessingStatus::Finalised),
        Just(ProcessingStatus::FinalisedElsewhere),
    ]
}
