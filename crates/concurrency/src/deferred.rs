//! Deferred results and the `then` chaining operation
//!
//! A deferred result is split into two handles over the same cell:
//!
//! - [`Deferred`]: observe and chain (`then`, `state`, `outcome`)
//! - [`Resolver`]: settle (`resolve`, `fulfill`, `reject`)
//!
//! ```ignore
//! let queue = TaskQueue::new();
//! let (deferred, resolver) = Deferred::<i64, MyError>::pending(&queue);
//!
//! let doubled = deferred.on_fulfilled(|v| Ok(Resolution::Value(v * 2)));
//! resolver.fulfill(21);
//!
//! queue.run_until_idle();
//! assert_eq!(doubled.outcome(), Some(Ok(42)));
//! ```
//!
//! `then` never runs a handler before returning, even on a settled result.
//! Handlers receive the value or reason as their only argument and report
//! failure by returning `Err`; a panic is converted into a rejection too.

use crate::cell::{CellId, CellState, Reaction, SettlementCell};
use crate::queue::TaskQueue;
use crate::resolution::{self, RejectFn, Resolution, ResolveFn, SubscribeCapable};
use crate::{Payload, Reason};
use std::fmt;
use std::sync::Arc;

/// What a continuation produces: a resolution for the derived result, or a
/// rejection reason
pub type HandlerResult<T, E> = Result<Resolution<T, E>, E>;

/// Continuation run with the fulfilment value
pub type OnFulfilled<T, E> = Box<dyn FnOnce(T) -> HandlerResult<T, E> + Send + 'static>;

/// Continuation run with the rejection reason
pub type OnRejected<T, E> = Box<dyn FnOnce(E) -> HandlerResult<T, E> + Send + 'static>;

/// Observable settlement state of a deferred result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeferredState {
    /// Not settled yet
    Pending,
    /// Settled with a value
    Fulfilled,
    /// Settled with a reason
    Rejected,
}

impl fmt::Display for DeferredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeferredState::Pending => write!(f, "pending"),
            DeferredState::Fulfilled => write!(f, "fulfilled"),
            DeferredState::Rejected => write!(f, "rejected"),
        }
    }
}

/// Read side of a deferred result
pub struct Deferred<T, E> {
    pub(crate) cell: Arc<SettlementCell<T, E>>,
}

/// Write side of a deferred result
///
/// Cloneable so completion sources can hold it from several places; only
/// the first settlement counts.
pub struct Resolver<T, E> {
    pub(crate) cell: Arc<SettlementCell<T, E>>,
}

impl<T: Payload, E: Reason> Deferred<T, E> {
    /// Create a pending result and the handle that settles it
    pub fn pending(queue: &TaskQueue) -> (Self, Resolver<T, E>) {
        let cell = SettlementCell::new(queue);
        (
            Deferred {
                cell: Arc::clone(&cell),
            },
            Resolver { cell },
        )
    }

    /// Create a result already fulfilled with `value`
    pub fn fulfilled(queue: &TaskQueue, value: T) -> Self {
        Deferred {
            cell: SettlementCell::with_state(queue, CellState::Fulfilled(value)),
        }
    }

    /// Create a result already rejected with `reason`
    pub fn rejected(queue: &TaskQueue, reason: E) -> Self {
        Deferred {
            cell: SettlementCell::with_state(queue, CellState::Rejected(reason)),
        }
    }

    /// Create a result settled through the resolution procedure
    ///
    /// Adopting another result leaves this one pending until the source
    /// settles.
    pub fn resolved(queue: &TaskQueue, resolution: Resolution<T, E>) -> Self {
        let (deferred, resolver) = Self::pending(queue);
        resolver.resolve(resolution);
        deferred
    }

    /// Register continuations and return the derived result
    ///
    /// `None` passes the outcome through unchanged. The returned result is
    /// always a new, distinct cell on the same queue.
    pub fn then(
        &self,
        on_fulfilled: Option<OnFulfilled<T, E>>,
        on_rejected: Option<OnRejected<T, E>>,
    ) -> Deferred<T, E> {
        let (derived, resolver) = Deferred::pending(self.cell.queue());
        self.cell.subscribe(Reaction::Chain {
            on_fulfilled,
            on_rejected,
            derived: resolver,
        });
        derived
    }

    /// `then` with only a fulfilment continuation
    pub fn on_fulfilled<F>(&self, f: F) -> Deferred<T, E>
    where
        F: FnOnce(T) -> HandlerResult<T, E> + Send + 'static,
    {
        self.then(Some(Box::new(f)), None)
    }

    /// `then` with only a rejection continuation
    pub fn on_rejected<R>(&self, r: R) -> Deferred<T, E>
    where
        R: FnOnce(E) -> HandlerResult<T, E> + Send + 'static,
    {
        self.then(None, Some(Box::new(r)))
    }

    /// `then` with both continuations
    pub fn then_with<F, R>(&self, f: F, r: R) -> Deferred<T, E>
    where
        F: FnOnce(T) -> HandlerResult<T, E> + Send + 'static,
        R: FnOnce(E) -> HandlerResult<T, E> + Send + 'static,
    {
        self.then(Some(Box::new(f)), Some(Box::new(r)))
    }

    /// `then` with no continuations: a new result mirroring this one
    pub fn pass_through(&self) -> Deferred<T, E> {
        self.then(None, None)
    }

    /// Current settlement state
    pub fn state(&self) -> DeferredState {
        self.cell.state_kind()
    }

    /// Clone of the outcome, `None` while pending
    pub fn outcome(&self) -> Option<Result<T, E>> {
        self.cell.outcome()
    }

    /// Check if not settled yet
    pub fn is_pending(&self) -> bool {
        self.cell.is_pending()
    }

    /// Check if fulfilled
    pub fn is_fulfilled(&self) -> bool {
        self.state() == DeferredState::Fulfilled
    }

    /// Check if rejected
    pub fn is_rejected(&self) -> bool {
        self.cell.is_rejected()
    }

    /// Identifier of the underlying cell
    pub fn id(&self) -> CellId {
        self.cell.id()
    }

    /// Queue this result dispatches its continuations on
    pub fn queue(&self) -> &TaskQueue {
        self.cell.queue()
    }

    /// Check if both handles refer to the same cell
    pub fn ptr_eq(&self, other: &Deferred<T, E>) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}

impl<T: Payload, E: Reason> Resolver<T, E> {
    /// Settle through the resolution procedure
    ///
    /// Returns `false` if the result was already settled or is adopting
    /// another result.
    pub fn resolve(&self, resolution: Resolution<T, E>) -> bool {
        resolution::resolve(&self.cell, resolution, false)
    }

    /// Settle with a plain value
    pub fn fulfill(&self, value: T) -> bool {
        self.resolve(Resolution::Value(value))
    }

    /// Settle with a rejection reason
    pub fn reject(&self, reason: E) -> bool {
        self.cell.commit(Err(reason), false)
    }

    /// Check if a settlement through this handle would still be accepted
    pub fn is_open(&self) -> bool {
        self.cell.accepts(false)
    }

    /// Identifier of the underlying cell
    pub fn id(&self) -> CellId {
        self.cell.id()
    }

    /// Read handle for the same cell
    pub fn deferred(&self) -> Deferred<T, E> {
        Deferred {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T: Payload, E: Reason> SubscribeCapable<T, E> for Deferred<T, E> {
    fn subscribe(&self, on_fulfilled: ResolveFn<T, E>, on_rejected: RejectFn<E>) -> Result<(), E> {
        self.cell.subscribe(Reaction::Observe {
            on_fulfilled,
            on_rejected,
        });
        Ok(())
    }

    fn as_deferred(&self) -> Option<&Deferred<T, E>> {
        Some(self)
    }
}

impl<T, E> Clone for Deferred<T, E> {
    fn clone(&self) -> Self {
        Deferred {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T, E> Clone for Resolver<T, E> {
    fn clone(&self) -> Self {
        Resolver {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T: Payload, E: Reason> fmt::Debug for Deferred<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}

impl<T: Payload, E: Reason> fmt::Debug for Resolver<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("id", &self.id())
            .field("open", &self.is_open())
            .finish()
    }
}
