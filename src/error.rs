//! Unified error types for Strata sessions.
//!
//! Every failure a session chain can see is an [`Error`]: factory failures,
//! configuration problems, errors returned by user continuations, and the
//! deferred core's own cycle and panic reports.

use strata_core::DeferredError;
use thiserror::Error;

/// All Strata session errors.
///
/// `Clone` because a rejection reason is handed to every continuation
/// registered on the rejected result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The user/password pair was not accepted
    #[error("bad credentials for user '{user}'")]
    BadCredentials {
        /// User that tried to connect
        user: String,
    },

    /// The server could not be reached
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    /// No factory serves the requested implementation
    #[error("unknown implementation: {0}")]
    UnknownImplementation(String),

    /// Operation on a session that was already closed
    #[error("session {0} is closed")]
    SessionClosed(String),

    /// Invalid or unreadable configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Error raised by application code inside a continuation
    #[error("{0}")]
    Application(String),

    /// Error raised by the deferred core
    #[error(transparent)]
    Deferred(#[from] DeferredError),
}

/// Result type for Strata session operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for an application error with the given message.
    pub fn application(message: impl Into<String>) -> Self {
        Error::Application(message.into())
    }

    /// Check if this is a self-resolution cycle.
    pub fn is_cycle(&self) -> bool {
        matches!(self, Error::Deferred(e) if e.is_cycle())
    }

    /// Check if this is a credentials failure.
    pub fn is_credentials(&self) -> bool {
        matches!(self, Error::BadCredentials { .. })
    }

    /// Check if a continuation or operation panicked.
    pub fn is_panic(&self) -> bool {
        matches!(self, Error::Deferred(e) if e.is_panic())
    }

    /// Check if the failure happened while connecting.
    pub fn is_connect(&self) -> bool {
        matches!(
            self,
            Error::BadCredentials { .. }
                | Error::ConnectionRefused(_)
                | Error::UnknownImplementation(_)
        )
    }
}

// Convert from config parse errors
impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
