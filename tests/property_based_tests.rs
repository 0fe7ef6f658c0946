mod common;

use chrono::{Duration, Utc};
use common::strategies::*;
use proptest::prelude::*;
use taskmesh_core::models::{DataManifest, FulfillmentTask, UnitOfWork, UoWPayload};
use taskmesh_core::{Fdn, ProcessingStatus};

fn parcel() -> FulfillmentTask {
    let manifest = DataManifest::new(Fdn::new("resource", "Patient").unwrap(), "1");
    FulfillmentTask::register(
        Fdn::new("instance", "1").unwrap(),
        Fdn::new("wup", "ingest").unwrap(),
        UnitOfWork::new(
            Fdn::new("uow-type", "adt").unwrap(),
            UoWPayload::new(manifest, "{}"),
        ),
        None,
        Utc::now(),
    )
}

proptest! {
    /// Property: parsing a serialized identifier yields the same RDN sequence
    #[test]
    fn identifier_token_round_trips(rdns in rdn_sequence_strategy()) {
        let fdn = Fdn::from_rdns(rdns.clone());
        let parsed = Fdn::from_token(fdn.token()).unwrap();
        prop_assert_eq!(parsed.rdns(), rdns.as_slice());
        prop_assert_eq!(&parsed, &fdn);
    }

    /// Property: identifiers round-trip through serde as their token
    #[test]
    fn identifier_serde_round_trips(rdns in rdn_sequence_strategy()) {
        let fdn = Fdn::from_rdns(rdns);
        let json = serde_json::to_string(&fdn).unwrap();
        let back: Fdn = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, fdn);
    }

    /// Property: parent of an appended identifier is the identifier it was appended to
    #[test]
    fn append_then_parent_is_identity(rdns in rdn_sequence_strategy(), leaf in rdn_strategy()) {
        let fdn = Fdn::from_rdns(rdns);
        let child = fdn.append(leaf);
        prop_assert!(child.is_descendant_of(&fdn));
        prop_assert_eq!(child.parent(), Some(fdn));
    }

    /// Property: observed processing statuses never move backwards in the lattice
    #[test]
    fn processing_status_is_monotonic(requests in prop::collection::vec(processing_status_strategy(), 1..24)) {
        let mut parcel = parcel();
        let mut at = Utc::now();
        let mut observed = vec![parcel.processing_status()];

        for next in requests {
            at += Duration::seconds(1);
            let before = parcel.processing_status();
            match parcel.transition_to(next, at) {
                Ok(()) => prop_assert!(before.can_transition_to(next)),
                Err(_) => prop_assert_eq!(parcel.processing_status(), before),
            }
            observed.push(parcel.processing_status());
        }

        for pair in observed.windows(2) {
            prop_assert!(pair[0].rank() <= pair[1].rank(), "status regressed: {:?}", pair);
            if pair[0].is_terminal() && pair[1].rank() == pair[0].rank() {
                prop_assert_eq!(pair[0], pair[1]);
            }
        }
    }
}

#[test]
fn test_malformed_tokens_are_rejected() {
    for token in ["wup=ingest]", "[wup=ingest", "[wupingest]", "[wup=a]x", "[wup=a\\"] {
        assert!(Fdn::from_token(token).is_err(), "{token} should not parse");
    }
    assert_eq!(Fdn::from_token("").unwrap(), Fdn::root());
    assert_eq!(
        ProcessingStatus::Finalised.rank(),
        ProcessingStatus::FinalisedElsewhere.rank()
    );
}
