//! Sessions and the factory boundary.
//!
//! A [`SessionFactory`] opens sessions in completion style: it is handed a
//! success callback and a failure callback and must call exactly one of
//! them, once, now or later, from any thread. The client turns that into a
//! [`SessionPromise`] through the completion adapter.
//!
//! Continuations on a session chain may return the session itself or plain
//! data, so the chain carries a [`SessionValue`].

use crate::config::ConnectionProperties;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use strata_concurrency::Deferred;
use strata_core::Value;
use tracing::info;
use uuid::Uuid;

/// Deferred result of opening a session
pub type SessionPromise = Deferred<SessionValue, Error>;

/// Success callback handed to a factory
pub type SuccessCallback = Box<dyn Fn(Session) + Send + Sync + 'static>;

/// Failure callback handed to a factory
pub type FailureCallback = Box<dyn Fn(Error) + Send + Sync + 'static>;

/// Boundary to the machinery that actually opens sessions
pub trait SessionFactory: Send + Sync {
    /// Implementation name this factory serves
    fn implementation(&self) -> &str;

    /// Start opening a session
    ///
    /// Must eventually call exactly one of `on_success` or `on_failure`,
    /// once. Extra calls are ignored by the client but logged.
    fn connect(
        &self,
        properties: &ConnectionProperties,
        on_success: SuccessCallback,
        on_failure: FailureCallback,
    );
}

struct SessionInner {
    id: Uuid,
    user: String,
    database: String,
    implementation: String,
    opened_at: DateTime<Utc>,
    closed: AtomicBool,
    open_count: Option<Arc<AtomicUsize>>,
}

/// Handle to an open session
///
/// Cloning produces another handle to the same session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Create an open session for `properties`
    pub fn new(properties: &ConnectionProperties) -> Self {
        Self::build(properties, None)
    }

    /// Create a session that decrements `open_count` when closed
    pub(crate) fn tracked(properties: &ConnectionProperties, open_count: Arc<AtomicUsize>) -> Self {
        open_count.fetch_add(1, Ordering::AcqRel);
        Self::build(properties, Some(open_count))
    }

    fn build(properties: &ConnectionProperties, open_count: Option<Arc<AtomicUsize>>) -> Self {
        let session = Session {
            inner: Arc::new(SessionInner {
                id: Uuid::new_v4(),
                user: properties.user.clone(),
                database: properties.database.clone(),
                implementation: properties.implementation.clone(),
                opened_at: Utc::now(),
                closed: AtomicBool::new(false),
                open_count,
            }),
        };
        info!(
            session = %session.id(),
            user = %session.user(),
            database = %session.database(),
            "session opened"
        );
        session
    }

    /// Unique session identifier
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// User the session was opened for
    pub fn user(&self) -> &str {
        &self.inner.user
    }

    /// Default database of the session
    pub fn database(&self) -> &str {
        &self.inner.database
    }

    /// Implementation that opened the session
    pub fn implementation(&self) -> &str {
        &self.inner.implementation
    }

    /// When the session was opened
    pub fn opened_at(&self) -> DateTime<Utc> {
        self.inner.opened_at
    }

    /// Check if the session has been closed
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Fail with `SessionClosed` if the session is closed
    pub fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::SessionClosed(self.id().to_string()));
        }
        Ok(())
    }

    /// Close the session
    ///
    /// Closing twice fails with `SessionClosed`.
    pub fn close(&self) -> Result<()> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return Err(Error::SessionClosed(self.id().to_string()));
        }
        if let Some(count) = &self.inner.open_count {
            count.fetch_sub(1, Ordering::AcqRel);
        }
        info!(session = %self.id(), "session closed");
        Ok(())
    }

    /// Check if both handles refer to the same session
    pub fn ptr_eq(&self, other: &Session) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("user", &self.inner.user)
            .field("database", &self.inner.database)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Value carried along a session chain
#[derive(Debug, Clone, PartialEq)]
pub enum SessionValue {
    /// An open session
    Session(Session),
    /// Plain data produced by a continuation
    Value(Value),
}

impl SessionValue {
    /// The session, if this is one
    pub fn as_session(&self) -> Option<&Session> {
        match self {
            SessionValue::Session(s) => Some(s),
            SessionValue::Value(_) => None,
        }
    }

    /// The plain value, if this is one
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            SessionValue::Value(v) => Some(v),
            SessionValue::Session(_) => None,
        }
    }

    /// Take the session, failing with an application error otherwise
    pub fn into_session(self) -> Result<Session> {
        match self {
            SessionValue::Session(s) => Ok(s),
            SessionValue::Value(v) => Err(Error::Application(format!(
                "expected a session, got {}",
                v.type_name()
            ))),
        }
    }

    /// Check if this is a session
    pub fn is_session(&self) -> bool {
        matches!(self, SessionValue::Session(_))
    }
}

impl From<Session> for SessionValue {
    fn from(s: Session) -> Self {
        SessionValue::Session(s)
    }
}

impl From<Value> for SessionValue {
    fn from(v: Value) -> Self {
        SessionValue::Value(v)
    }
}

impl From<i64> for SessionValue {
    fn from(n: i64) -> Self {
        SessionValue::Value(n.into())
    }
}

impl From<bool> for SessionValue {
    fn from(b: bool) -> Self {
        SessionValue::Value(b.into())
    }
}

impl From<&str> for SessionValue {
    fn from(s: &str) -> Self {
        SessionValue::Value(s.into())
    }
}

impl PartialEq<Value> for SessionValue {
    fn eq(&self, other: &Value) -> bool {
        self.as_value() == Some(other)
    }
}
