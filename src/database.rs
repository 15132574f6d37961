//! Main client entry point for Strata sessions.
//!
//! This module provides the `Strata` struct, which opens sessions through a
//! [`SessionFactory`] in one of two mutually exclusive modes:
//!
//! - deferred mode: [`Strata::open_session`] returns a [`SessionPromise`]
//! - callback mode: [`Strata::open_session_with`] calls back once and
//!   creates no deferred result

use crate::config::ConnectionProperties;
use crate::error::Result;
use crate::memory::MemorySessionFactory;
use crate::session::{Session, SessionFactory, SessionPromise, SessionValue};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use strata_concurrency::{from_completion, TaskQueue};
use tracing::{info, warn};

/// The Strata session client.
///
/// # Example
///
/// ```ignore
/// use strata_thenable::prelude::*;
///
/// let strata = Strata::builder().queue(TaskQueue::new()).build();
///
/// strata
///     .open_session(&ConnectionProperties::default())
///     .on_fulfilled(|s| {
///         let session = s.into_session()?;
///         session.close()?;
///         Ok(Resolution::value(49i64))
///     });
///
/// strata.run_until_idle();
/// ```
#[derive(Clone)]
pub struct Strata {
    factory: Arc<dyn SessionFactory>,
    queue: TaskQueue,
    defaults: ConnectionProperties,
}

impl Strata {
    /// Client over the in-memory factory and the global queue.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a builder for client configuration.
    pub fn builder() -> StrataBuilder {
        StrataBuilder::new()
    }

    /// Open a session and return its deferred result.
    ///
    /// The factory is called before this returns. Continuations on the
    /// result run when the client's queue is drained.
    pub fn open_session(&self, properties: &ConnectionProperties) -> SessionPromise {
        info!(
            user = %properties.user,
            implementation = %properties.implementation,
            "opening session"
        );
        let factory = Arc::clone(&self.factory);
        from_completion(&self.queue, move |completion| {
            let (on_success, on_failure) = completion.into_callbacks();
            factory.connect(
                properties,
                Box::new(move |session| on_success(SessionValue::Session(session))),
                Box::new(on_failure),
            );
        })
    }

    /// Open a session with the client's default properties.
    pub fn open_default_session(&self) -> SessionPromise {
        self.open_session(&self.defaults)
    }

    /// Open a session and report the outcome to `callback`.
    ///
    /// No deferred result is created. `callback` runs at most once, on
    /// whichever thread the factory completes on; extra completions from a
    /// misbehaving factory are dropped.
    pub fn open_session_with<F>(&self, properties: &ConnectionProperties, callback: F)
    where
        F: FnOnce(Result<Session>) + Send + 'static,
    {
        info!(
            user = %properties.user,
            implementation = %properties.implementation,
            "opening session (callback mode)"
        );
        let slot: Arc<Mutex<Option<F>>> = Arc::new(Mutex::new(Some(callback)));
        let on_failure = Arc::clone(&slot);
        self.factory.connect(
            properties,
            Box::new(move |session| deliver(&slot, Ok(session))),
            Box::new(move |err| deliver(&on_failure, Err(err))),
        );
    }

    /// Run scheduled continuations until none are left.
    ///
    /// Returns the number of tasks run.
    pub fn run_until_idle(&self) -> usize {
        self.queue.run_until_idle()
    }

    /// Queue this client's results dispatch on.
    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    /// Properties used by [`Strata::open_default_session`].
    pub fn default_properties(&self) -> &ConnectionProperties {
        &self.defaults
    }

    /// Implementation name of the configured factory.
    pub fn implementation(&self) -> &str {
        self.factory.implementation()
    }
}

fn deliver<F>(slot: &Mutex<Option<F>>, outcome: Result<Session>)
where
    F: FnOnce(Result<Session>),
{
    // Take the callback before calling it so the lock is not held
    let callback = slot.lock().take();
    match callback {
        Some(callback) => callback(outcome),
        None => warn!("session callback fired more than once; ignoring"),
    }
}

impl Default for Strata {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Strata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strata")
            .field("implementation", &self.implementation())
            .field("queue", &self.queue)
            .field("defaults", &self.defaults)
            .finish()
    }
}

/// Builder for client configuration.
///
/// # Example
///
/// ```ignore
/// // Tests: private queue, in-memory factory with an extra user
/// let strata = Strata::builder()
///     .factory(MemorySessionFactory::new().with_user("alice", "secret"))
///     .queue(TaskQueue::new())
///     .build();
///
/// // Defaults from a config file
/// let strata = Strata::builder().properties_file("strata.toml")?.build();
/// ```
pub struct StrataBuilder {
    factory: Option<Arc<dyn SessionFactory>>,
    queue: Option<TaskQueue>,
    defaults: ConnectionProperties,
}

impl StrataBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            factory: None,
            queue: None,
            defaults: ConnectionProperties::default(),
        }
    }

    /// Use `factory` to open sessions.
    pub fn factory(mut self, factory: impl SessionFactory + 'static) -> Self {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Use a shared factory to open sessions.
    pub fn shared_factory(mut self, factory: Arc<dyn SessionFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Dispatch continuations on `queue` instead of the global queue.
    pub fn queue(mut self, queue: TaskQueue) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Properties for [`Strata::open_default_session`].
    pub fn properties(mut self, properties: ConnectionProperties) -> Self {
        self.defaults = properties;
        self
    }

    /// Load default properties from a TOML file.
    pub fn properties_file(mut self, path: impl AsRef<std::path::Path>) -> Result<Self> {
        self.defaults = ConnectionProperties::load(path)?;
        Ok(self)
    }

    /// Build the client.
    pub fn build(self) -> Strata {
        let factory = self
            .factory
            .unwrap_or_else(|| Arc::new(MemorySessionFactory::new()));
        Strata {
            factory,
            queue: self.queue.unwrap_or_else(TaskQueue::global),
            defaults: self.defaults,
        }
    }

    /// Build the client, checking the default properties first.
    pub fn try_build(self) -> Result<Strata> {
        self.defaults.validate()?;
        Ok(self.build())
    }
}

impl Default for StrataBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl From<StrataBuilder> for Strata {
    fn from(builder: StrataBuilder) -> Self {
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use strata_concurrency::Resolution;

    fn client() -> Strata {
        Strata::builder().queue(TaskQueue::new()).build()
    }

    #[test]
    fn test_builder_defaults() {
        let strata = Strata::builder().build();
        assert_eq!(strata.implementation(), "memory");
        assert!(strata.queue().same_queue(&TaskQueue::global()));
        assert_eq!(strata.default_properties(), &ConnectionProperties::default());
    }

    #[test]
    fn test_open_session_fulfils() {
        let strata = client();
        let promise = strata.open_default_session();
        assert!(promise.is_fulfilled());
        let session = promise.outcome().unwrap().unwrap().into_session().unwrap();
        assert_eq!(session.user(), "root");
    }

    #[test]
    fn test_open_session_rejects() {
        let strata = client();
        let promise = strata.open_session(&ConnectionProperties::for_user("_BAD_USER_", "x"));
        let err = promise.outcome().unwrap().unwrap_err();
        assert!(err.is_credentials());
    }

    #[test]
    fn test_continuations_wait_for_drain() {
        let strata = client();
        let derived = strata
            .open_default_session()
            .on_fulfilled(|_| Ok(Resolution::value(49i64)));
        assert!(derived.is_pending());
        assert!(strata.run_until_idle() > 0);
        assert_eq!(derived.outcome().unwrap().unwrap(), strata_core::Value::Int(49));
    }

    #[test]
    fn test_callback_mode_single_delivery() {
        let strata = client();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        strata.open_session_with(&ConnectionProperties::default(), move |r| {
            s.lock().push(r.is_ok())
        });
        assert_eq!(*seen.lock(), vec![true]);
        assert!(strata.queue().is_empty());
    }

    #[test]
    fn test_try_build_validates() {
        let mut props = ConnectionProperties::default();
        props.port = 0;
        let err = Strata::builder().properties(props).try_build().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
