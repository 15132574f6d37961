//! onFulfilled behaviour on session results

use crate::common::*;
use strata_thenable::prelude::*;

// ============================================================================
// Single handler
// ============================================================================

#[test]
fn test_on_fulfilled_receives_session_once() {
    let strata = test_client();
    let log = EventLog::new();
    let l = log.clone();

    let promise = strata.open_session(&good_properties());
    promise.on_fulfilled(move |value| {
        let session = value.clone().into_session()?;
        l.push(format!("session:{}", session.user()));
        session.close()?;
        Ok(Resolution::Value(value))
    });

    // Settled already, but the handler waits for the drain
    assert!(promise.is_fulfilled());
    assert!(log.events().is_empty());

    strata.run_until_idle();
    strata.run_until_idle();
    assert_eq!(log.events(), vec!["session:strata_test"]);
}

#[test]
fn test_handler_registered_before_settlement() {
    let strata = queued_client();
    let log = EventLog::new();
    let l = log.clone();

    let promise = strata.open_session(&good_properties());
    assert!(promise.is_pending());
    let derived = promise.on_fulfilled(move |value| {
        l.push("fulfilled");
        Ok(Resolution::Value(value))
    });

    strata.run_until_idle();
    assert_eq!(log.count("fulfilled"), 1);
    assert!(derived.outcome().unwrap().unwrap().is_session());
}

// ============================================================================
// Multiple handlers
// ============================================================================

#[test]
fn test_multiple_on_fulfilled_called_in_order() {
    let strata = queued_client();
    let log = EventLog::new();
    let promise = strata.open_session(&good_properties());

    for n in 1..=3 {
        let l = log.clone();
        promise.on_fulfilled(move |value| {
            l.push(format!("f{}", n));
            Ok(Resolution::Value(value))
        });
    }

    strata.run_until_idle();
    assert_eq!(log.events(), vec!["f1", "f2", "f3"]);
}

#[test]
fn test_handlers_share_one_session() {
    let strata = test_client();
    let promise = strata.open_session(&good_properties());
    let a = promise.pass_through();
    let b = promise.pass_through();
    strata.run_until_idle();

    let a = a.outcome().unwrap().unwrap().into_session().unwrap();
    let b = b.outcome().unwrap().unwrap().into_session().unwrap();
    assert!(a.ptr_eq(&b));
    a.close().unwrap();
    assert!(b.is_closed());
}

#[test]
fn test_then_returns_new_result() {
    let strata = test_client();
    let promise = strata.open_session(&good_properties());
    let derived = promise.then(None, None);
    assert!(!derived.ptr_eq(&promise));
    assert_ne!(derived.id(), promise.id());
    strata.run_until_idle();
    assert_eq!(derived.state(), DeferredState::Fulfilled);
}
