//! Callback-mode session opening

use crate::common::*;
use parking_lot::Mutex;
use std::sync::Arc;
use strata_thenable::prelude::*;

#[test]
fn test_callback_receives_session() {
    let strata = test_client();
    let seen: Arc<Mutex<Option<Result<Session>>>> = Arc::new(Mutex::new(None));
    let s = Arc::clone(&seen);

    strata.open_session_with(&good_properties(), move |result| {
        *s.lock() = Some(result);
    });

    let session = seen.lock().take().unwrap().unwrap();
    assert_eq!(session.user(), "strata_test");
    session.close().unwrap();
    // No continuation was scheduled
    assert!(strata.queue().is_empty());
}

#[test]
fn test_callback_receives_error() {
    let strata = test_client();
    let log = EventLog::new();
    let l = log.clone();

    strata.open_session_with(&bad_properties(), move |result| match result {
        Ok(_) => l.push("session"),
        Err(e) => l.push(format!("error:{}", e.is_connect())),
    });

    assert_eq!(log.events(), vec!["error:true"]);
}

#[test]
fn test_callback_with_queued_factory() {
    let strata = queued_client();
    let log = EventLog::new();
    let l = log.clone();

    strata.open_session_with(&good_properties(), move |result| {
        l.push(format!("ok:{}", result.is_ok()));
    });
    assert!(log.events().is_empty());

    strata.run_until_idle();
    assert_eq!(log.events(), vec!["ok:true"]);
}

/// Factory that reports success twice and then a failure
struct Stuttering;

impl SessionFactory for Stuttering {
    fn implementation(&self) -> &str {
        "memory"
    }

    fn connect(
        &self,
        properties: &ConnectionProperties,
        on_success: strata_thenable::SuccessCallback,
        on_failure: strata_thenable::FailureCallback,
    ) {
        on_success(Session::new(properties));
        on_success(Session::new(properties));
        on_failure(Error::ConnectionRefused("late".into()));
    }
}

#[test]
fn test_misbehaving_factory_delivers_once() {
    let strata = Strata::builder()
        .factory(Stuttering)
        .queue(TaskQueue::new())
        .build();

    let log = EventLog::new();
    let l = log.clone();
    strata.open_session_with(&good_properties(), move |result| {
        l.push(format!("ok:{}", result.is_ok()));
    });
    assert_eq!(log.events(), vec!["ok:true"]);

    // Deferred mode absorbs the extra calls the same way
    let promise = strata.open_session(&good_properties());
    let fired = EventLog::new();
    let f = fired.clone();
    promise.then_with(
        move |value| {
            f.push("fulfilled");
            Ok(Resolution::Value(value))
        },
        |e| Err(e),
    );
    strata.run_until_idle();
    assert_eq!(fired.events(), vec!["fulfilled"]);
}
