//! Chaining continuations on session results

use crate::common::*;
use std::sync::Arc;
use strata_thenable::prelude::*;
use strata_thenable::{DeferredError, RejectionObserver};

// ============================================================================
// Values and errors
// ============================================================================

#[test]
fn test_handler_error_rejects_derived() {
    let strata = test_client();
    let log = EventLog::new();
    let l = log.clone();

    strata
        .open_session(&good_properties())
        .on_fulfilled(|value| {
            value.into_session()?.close()?;
            Err(Error::application("x"))
        })
        .on_rejected(move |e| {
            l.push(e.to_string());
            Ok(Resolution::value(true))
        });

    strata.run_until_idle();
    assert_eq!(log.events(), vec!["x"]);
}

#[test]
fn test_returned_value_reaches_next_handler() {
    let strata = test_client();
    let log = EventLog::new();
    let l = log.clone();

    strata
        .open_session(&good_properties())
        .on_fulfilled(|value| {
            value.into_session()?.close()?;
            Ok(Resolution::value(49i64))
        })
        .on_fulfilled(move |value| {
            l.push(format!("is_49:{}", value == Value::Int(49)));
            Ok(Resolution::Value(value))
        });

    strata.run_until_idle();
    assert_eq!(log.events(), vec!["is_49:true"]);
}

#[test]
fn test_on_rejected_returning_value_fulfils() {
    let strata = test_client();
    let log = EventLog::new();
    let (ok, err) = (log.clone(), log.clone());

    let recovered = strata
        .open_session(&bad_properties())
        .then(None, Some(Box::new(|_: Error| Ok(Resolution::value(49i64)))));
    recovered.then_with(
        move |value| {
            ok.push(format!("fulfilled:{}", value == Value::Int(49)));
            Ok(Resolution::Value(value))
        },
        move |e| {
            err.push("rejected");
            Err(e)
        },
    );

    strata.run_until_idle();
    assert_eq!(log.events(), vec!["fulfilled:true"]);
}

#[test]
fn test_panicking_handler_rejects() {
    let strata = test_client();
    let derived = strata
        .open_session(&good_properties())
        .on_fulfilled(|_| panic!("handler bug"));

    strata.run_until_idle();
    let reason = derived.outcome().unwrap().unwrap_err();
    assert!(reason.is_panic());
    assert!(reason.to_string().contains("handler bug"));
}

#[test]
fn test_using_closed_session_rejects() {
    let strata = test_client();
    let derived = strata
        .open_session(&good_properties())
        .on_fulfilled(|value| {
            let session = value.into_session()?;
            session.close()?;
            Ok(Resolution::Value(SessionValue::Session(session)))
        })
        .on_fulfilled(|value| {
            value.into_session()?.ensure_open()?;
            Ok(Resolution::value(true))
        });

    strata.run_until_idle();
    assert!(matches!(
        derived.outcome().unwrap(),
        Err(Error::SessionClosed(_))
    ));
}

// ============================================================================
// Adoption
// ============================================================================

#[test]
fn test_handler_returning_second_session_is_adopted() {
    let strata = queued_client();
    let opener = strata.clone();

    let second = strata
        .open_session(&bad_properties())
        .on_rejected(move |_| Ok(opener.open_session(&good_properties()).into()));

    strata.run_until_idle();
    let session = second.outcome().unwrap().unwrap().into_session().unwrap();
    assert_eq!(session.user(), "strata_test");
}

#[test]
fn test_self_resolution_rejects_with_cycle() {
    let strata = test_client();
    let (deferred, resolver) = SessionPromise::pending(strata.queue());
    assert!(resolver.resolve(deferred.clone().into()));

    assert!(deferred.outcome().unwrap().unwrap_err().is_cycle());
}

#[test]
fn test_resolution_with_core_error() {
    let strata = test_client();
    let rejected = SessionPromise::rejected(strata.queue(), DeferredError::Cycle.into());
    let recovered = rejected.on_rejected(|e| {
        assert!(e.is_cycle());
        Ok(Resolution::value("recovered"))
    });
    strata.run_until_idle();
    assert_eq!(recovered.outcome().unwrap().unwrap(), Value::from("recovered"));
}

// ============================================================================
// Unhandled rejections
// ============================================================================

#[derive(Default)]
struct CountingObserver(parking_lot::Mutex<usize>);

impl RejectionObserver for CountingObserver {
    fn unhandled_rejection(&self, _cell: strata_thenable::CellId, _reason: &str) {
        *self.0.lock() += 1;
    }
}

#[test]
fn test_unhandled_session_rejection_is_observed() {
    let strata = test_client();
    let observer = Arc::new(CountingObserver::default());
    strata.queue().set_rejection_observer(observer.clone());

    let _unhandled = strata.open_session(&bad_properties());
    let handled = strata.open_session(&bad_properties());
    let _recovered = handled.on_rejected(|_| Ok(Resolution::value(0i64)));

    strata.run_until_idle();
    assert_eq!(*observer.0.lock(), 1);
}
