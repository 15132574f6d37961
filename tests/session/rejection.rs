//! onRejected behaviour on session results

use crate::common::*;
use strata_thenable::prelude::*;

#[test]
fn test_on_rejected_receives_reason_once() {
    let strata = test_client();
    let log = EventLog::new();
    let (ok, err) = (log.clone(), log.clone());

    strata.open_session(&bad_properties()).then_with(
        move |value| {
            ok.push("fulfilled");
            Ok(Resolution::Value(value))
        },
        move |e| {
            err.push(format!("rejected:{}", e.is_connect()));
            Err(e)
        },
    );

    strata.run_until_idle();
    assert_eq!(log.events(), vec!["rejected:true"]);
}

#[test]
fn test_bad_credentials_reason() {
    let strata = test_client();
    let props = ConnectionProperties::for_user("_BAD_USER_", "_NOT_A_REAL_PASSWORD!_");
    let promise = strata.open_session(&props);
    let reason = promise.outcome().unwrap().unwrap_err();
    assert!(reason.is_credentials());
}

#[test]
fn test_rejection_passes_through_missing_handler() {
    let strata = test_client();
    let promise = strata.open_session(&bad_properties());
    let derived = promise.on_fulfilled(|value| Ok(Resolution::Value(value)));

    strata.run_until_idle();
    assert!(derived.is_rejected());
    assert_eq!(derived.outcome(), promise.outcome());
}

#[test]
fn test_multiple_on_rejected_called_in_order() {
    let strata = queued_client();
    let log = EventLog::new();
    let promise = strata.open_session(&bad_properties());

    for n in 1..=3 {
        let l = log.clone();
        promise.on_rejected(move |e| {
            l.push(format!("r{}", n));
            Err(e)
        });
    }

    strata.run_until_idle();
    assert_eq!(log.events(), vec!["r1", "r2", "r3"]);
}

#[test]
fn test_unknown_implementation_rejects() {
    let strata = test_client();
    let props = good_properties().with_implementation("ndb");
    let reason = strata.open_session(&props).outcome().unwrap().unwrap_err();
    assert_eq!(reason, Error::UnknownImplementation("ndb".into()));
}
