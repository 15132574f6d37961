//! Concurrency layer for Strata: deferred results
//!
//! This crate implements single-settlement deferred results with chainable
//! continuations:
//! - SettlementCell: pending/fulfilled/rejected state, settled once
//! - Resolution procedure: adopt nested results or commit plain values
//! - Reaction dispatch: continuations run as queued tasks, in order
//! - `then`: register continuations, get a derived result back
//! - Completion adapter: success/failure callbacks into a deferred result
//! - TaskQueue: explicit FIFO of scheduled continuations
//!
//! Continuations never run inside the call that registers them. They run
//! when the owning [`TaskQueue`] is drained.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapter;
mod cell;
pub mod deferred;
mod dispatch;
pub mod queue;
pub mod resolution;

pub use adapter::{from_completion, Completion};
pub use cell::CellId;
pub use deferred::{Deferred, DeferredState, HandlerResult, OnFulfilled, OnRejected, Resolver};
pub use queue::{RejectionObserver, Task, TaskQueue};
pub use resolution::{RejectFn, Resolution, ResolveFn, SubscribeCapable};

// Re-export the core error so callers can build reason types from one import
pub use strata_core::DeferredError;

use std::fmt;

/// Bound for fulfilment values
///
/// Values are cloned once per reaction, so cheap clones (or `Arc`) are
/// preferable for large payloads.
pub trait Payload: Clone + Send + 'static {}

impl<T: Clone + Send + 'static> Payload for T {}

/// Bound for rejection reasons
///
/// Reasons must be constructible from [`DeferredError`] so the core can
/// report cycles and panics as ordinary rejections.
pub trait Reason: Clone + Send + fmt::Debug + From<DeferredError> + 'static {}

impl<E: Clone + Send + fmt::Debug + From<DeferredError> + 'static> Reason for E {}
