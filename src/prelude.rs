//! Convenient imports for Strata sessions.
//!
//! ```ignore
//! use strata_thenable::prelude::*;
//!
//! let strata = Strata::new();
//! let promise = strata.open_session(&ConnectionProperties::default());
//! ```

// Main entry point
pub use crate::database::{Strata, StrataBuilder};

// Error handling
pub use crate::error::{Error, Result};

// Sessions
pub use crate::config::ConnectionProperties;
pub use crate::memory::MemorySessionFactory;
pub use crate::session::{Session, SessionFactory, SessionPromise, SessionValue};

// Deferred core
pub use strata_concurrency::{Deferred, DeferredState, Resolution, Resolver, TaskQueue};
pub use strata_core::Value;
