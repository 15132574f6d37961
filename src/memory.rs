//! In-memory session factory.
//!
//! Stands in for a real server: it knows a fixed set of users, refuses
//! configured hosts, and opens sessions without any I/O. By default the
//! callbacks fire before `connect` returns; with [`complete_on`] they fire
//! from a queued task instead, like a driver finishing on its event loop.
//!
//! [`complete_on`]: MemorySessionFactory::complete_on

use crate::config::{ConnectionProperties, MEMORY_IMPLEMENTATION};
use crate::error::Error;
use crate::session::{FailureCallback, Session, SessionFactory, SuccessCallback};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use strata_concurrency::TaskQueue;
use tracing::debug;

/// Session factory backed by an in-memory user table
pub struct MemorySessionFactory {
    implementation: String,
    users: RwLock<HashMap<String, String>>,
    refused_hosts: RwLock<HashSet<String>>,
    completion_queue: Option<TaskQueue>,
    attempts: AtomicU64,
    open_sessions: Arc<AtomicUsize>,
}

impl MemorySessionFactory {
    /// Factory for the `memory` implementation with user `root` and an
    /// empty password
    pub fn new() -> Self {
        let mut users = HashMap::new();
        users.insert("root".to_string(), String::new());
        MemorySessionFactory {
            implementation: MEMORY_IMPLEMENTATION.to_string(),
            users: RwLock::new(users),
            refused_hosts: RwLock::new(HashSet::new()),
            completion_queue: None,
            attempts: AtomicU64::new(0),
            open_sessions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Serve a different implementation name
    pub fn with_implementation(mut self, implementation: impl Into<String>) -> Self {
        self.implementation = implementation.into();
        self
    }

    /// Register a user
    pub fn with_user(self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.add_user(user, password);
        self
    }

    /// Refuse connections to `host` (matched against host and connect string)
    pub fn refuse_host(self, host: impl Into<String>) -> Self {
        self.refused_hosts.write().insert(host.into());
        self
    }

    /// Fire callbacks from a task on `queue` instead of inline
    pub fn complete_on(mut self, queue: &TaskQueue) -> Self {
        self.completion_queue = Some(queue.clone());
        self
    }

    /// Register or replace a user
    pub fn add_user(&self, user: impl Into<String>, password: impl Into<String>) {
        self.users.write().insert(user.into(), password.into());
    }

    /// Remove a user; later connections as that user fail
    pub fn remove_user(&self, user: &str) -> bool {
        self.users.write().remove(user).is_some()
    }

    /// Number of `connect` calls so far
    pub fn connect_attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Number of sessions opened and not yet closed
    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::Acquire)
    }

    fn check(&self, properties: &ConnectionProperties) -> Result<(), Error> {
        if properties.implementation != self.implementation {
            return Err(Error::UnknownImplementation(properties.implementation.clone()));
        }
        {
            let refused = self.refused_hosts.read();
            if refused.contains(&properties.host) {
                return Err(Error::ConnectionRefused(properties.address()));
            }
            if let Some(cs) = &properties.connect_string {
                if refused.contains(cs) {
                    return Err(Error::ConnectionRefused(cs.clone()));
                }
            }
        }
        let users = self.users.read();
        match users.get(&properties.user) {
            Some(password) if *password == properties.password => Ok(()),
            _ => Err(Error::BadCredentials {
                user: properties.user.clone(),
            }),
        }
    }
}

impl Default for MemorySessionFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionFactory for MemorySessionFactory {
    fn implementation(&self) -> &str {
        &self.implementation
    }

    fn connect(
        &self,
        properties: &ConnectionProperties,
        on_success: SuccessCallback,
        on_failure: FailureCallback,
    ) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        let checked = self.check(properties);
        debug!(
            user = %properties.user,
            address = %properties.address(),
            ok = checked.is_ok(),
            "memory connect"
        );

        let properties = properties.clone();
        let open_sessions = Arc::clone(&self.open_sessions);
        let finish = move || match checked {
            Ok(()) => on_success(Session::tracked(&properties, open_sessions)),
            Err(e) => on_failure(e),
        };

        match &self.completion_queue {
            Some(queue) => queue.enqueue(finish),
            None => finish(),
        }
    }
}
