//! # Strata sessions
//!
//! Deferred session results with chainable continuations.
//!
//! Opening a session returns a [`SessionPromise`]: a deferred result that
//! settles exactly once and lets callers chain continuations with `then`.
//! Continuations never run inside the call that registers them; they run
//! when the client's [`TaskQueue`] is drained.
//!
//! ## Quick Start
//!
//! ```ignore
//! use strata_thenable::prelude::*;
//!
//! let strata = Strata::builder().queue(TaskQueue::new()).build();
//!
//! let answer = strata
//!     .open_session(&ConnectionProperties::default())
//!     .on_fulfilled(|s| {
//!         s.into_session()?.close()?;
//!         Ok(Resolution::value(49i64))
//!     })
//!     .on_rejected(|e| Err(e));
//!
//! strata.run_until_idle();
//! ```
//!
//! ## Layers
//!
//! - `strata-core`: [`DeferredError`] and the [`Value`] data type
//! - `strata-concurrency`: the deferred-result core ([`Deferred`],
//!   [`Resolver`], [`TaskQueue`], the completion adapter)
//! - this crate: the [`Strata`] client, [`ConnectionProperties`], the
//!   [`SessionFactory`] boundary and an in-memory factory

#![warn(missing_docs)]

mod config;
mod database;
mod error;
mod memory;
mod session;

pub mod prelude;

// Re-export main entry points
pub use database::{Strata, StrataBuilder};
pub use error::{Error, Result};

// Sessions
pub use config::{ConnectionProperties, MEMORY_IMPLEMENTATION};
pub use memory::MemorySessionFactory;
pub use session::{
    FailureCallback, Session, SessionFactory, SessionPromise, SessionValue, SuccessCallback,
};

// Deferred core
pub use strata_concurrency::{
    from_completion, CellId, Completion, Deferred, DeferredState, HandlerResult, RejectionObserver,
    Resolution, Resolver, SubscribeCapable, TaskQueue,
};
pub use strata_core::{DeferredError, Value};
