//! Shared test utilities for session integration tests.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::Once;
use strata_thenable::{ConnectionProperties, MemorySessionFactory, Strata, TaskQueue};

static TRACING: Once = Once::new();

/// Install a test-writer tracing subscriber once per test binary
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

/// Properties the test factory accepts
pub fn good_properties() -> ConnectionProperties {
    ConnectionProperties::for_user("strata_test", "strata_pw").with_database("test")
}

/// Properties the test factory rejects: unknown user and unreachable
/// connect string
pub fn bad_properties() -> ConnectionProperties {
    ConnectionProperties::for_user("_BAD_USER_", "_NOT_A_REAL_PASSWORD!_")
        .with_connect_string("this_host_does_not_exist")
}

/// Factory that knows the test user and refuses the bogus host
pub fn test_factory() -> MemorySessionFactory {
    MemorySessionFactory::new()
        .with_user("strata_test", "strata_pw")
        .refuse_host("this_host_does_not_exist")
}

/// Client over a private queue with inline factory completion
pub fn test_client() -> Strata {
    init_tracing();
    Strata::builder()
        .factory(test_factory())
        .queue(TaskQueue::new())
        .build()
}

/// Client whose factory completes from a queued task
pub fn queued_client() -> Strata {
    init_tracing();
    let queue = TaskQueue::new();
    Strata::builder()
        .factory(test_factory().complete_on(&queue))
        .queue(queue)
        .build()
}

/// Ordered event log shared between continuations
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.0.lock().iter().filter(|e| *e == event).count()
    }
}
