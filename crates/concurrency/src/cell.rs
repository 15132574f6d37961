//! Settlement cell: the state behind every deferred result
//!
//! A cell starts `Pending` and transitions to `Fulfilled` or `Rejected`
//! exactly once. Reactions registered while pending are kept in
//! subscription order and handed to the dispatcher when the cell settles;
//! reactions registered afterwards are dispatched on their own, still
//! through the task queue.
//!
//! ## Invariants
//!
//! - The transition out of `Pending` happens at most once; later attempts
//!   return `false` and change nothing
//! - The reaction list is taken out of the cell before any reaction runs,
//!   so a continuation that touches the same cell cannot dispatch twice
//! - While `adopting` is set, only the adoption callbacks may settle the cell
//!
//! The cell lock is never held while user code runs.

use crate::deferred::{DeferredState, OnFulfilled, OnRejected, Resolver};
use crate::dispatch;
use crate::queue::{TaskQueue, TrackedRejection};
use crate::resolution::{RejectFn, ResolveFn};
use crate::{Payload, Reason};
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::trace;

static NEXT_CELL_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a deferred result
///
/// Used in log output and in unhandled rejection reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(u64);

impl CellId {
    fn next() -> Self {
        CellId(NEXT_CELL_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[cfg(test)]
    pub(crate) fn for_test() -> Self {
        Self::next()
    }

    /// Raw numeric identifier
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell#{}", self.0)
    }
}

/// Settlement state with the outcome stored in the variant
pub(crate) enum CellState<T, E> {
    Pending,
    Fulfilled(T),
    Rejected(E),
}

impl<T: Clone, E: Clone> CellState<T, E> {
    fn outcome(&self) -> Option<Result<T, E>> {
        match self {
            CellState::Pending => None,
            CellState::Fulfilled(value) => Some(Ok(value.clone())),
            CellState::Rejected(reason) => Some(Err(reason.clone())),
        }
    }
}

/// A registered interest in a cell's outcome
pub(crate) enum Reaction<T, E> {
    /// Created by `then`: runs a handler and settles the derived cell
    Chain {
        on_fulfilled: Option<OnFulfilled<T, E>>,
        on_rejected: Option<OnRejected<T, E>>,
        derived: Resolver<T, E>,
    },
    /// Created when another cell adopts this one
    Observe {
        on_fulfilled: ResolveFn<T, E>,
        on_rejected: RejectFn<E>,
    },
}

struct CellInner<T, E> {
    state: CellState<T, E>,
    /// Most cells see one or two subscribers
    reactions: SmallVec<[Reaction<T, E>; 2]>,
    adopting: bool,
    handled: bool,
}

pub(crate) struct SettlementCell<T, E> {
    id: CellId,
    queue: TaskQueue,
    inner: Mutex<CellInner<T, E>>,
}

impl<T: Payload, E: Reason> SettlementCell<T, E> {
    pub(crate) fn new(queue: &TaskQueue) -> Arc<Self> {
        Self::with_state(queue, CellState::Pending)
    }

    pub(crate) fn with_state(queue: &TaskQueue, state: CellState<T, E>) -> Arc<Self> {
        let cell = Arc::new(SettlementCell {
            id: CellId::next(),
            queue: queue.clone(),
            inner: Mutex::new(CellInner {
                state,
                reactions: SmallVec::new(),
                adopting: false,
                handled: false,
            }),
        });
        if cell.is_rejected() {
            cell.track_if_unobserved();
        }
        cell
    }

    pub(crate) fn id(&self) -> CellId {
        self.id
    }

    pub(crate) fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    /// Register a reaction, dispatching it right away if already settled
    pub(crate) fn subscribe(&self, reaction: Reaction<T, E>) {
        let mut inner = self.inner.lock();
        inner.handled = true;
        let Some(outcome) = inner.state.outcome() else {
            inner.reactions.push(reaction);
            trace!(cell = %self.id, queued = inner.reactions.len(), "reaction queued");
            return;
        };
        drop(inner);

        trace!(cell = %self.id, "cell already settled; scheduling reaction");
        dispatch::schedule(&self.queue, self.id, reaction, outcome);
    }

    /// Whether a settlement attempt from this path would be accepted
    pub(crate) fn accepts(&self, from_adoption: bool) -> bool {
        let inner = self.inner.lock();
        matches!(inner.state, CellState::Pending) && (from_adoption || !inner.adopting)
    }

    /// Take the adoption lock
    ///
    /// Returns `false` if the cell is settled, or already adopting and the
    /// request does not come from the current adoption.
    pub(crate) fn begin_adoption(&self, from_adoption: bool) -> bool {
        let mut inner = self.inner.lock();
        if !matches!(inner.state, CellState::Pending) || (inner.adopting && !from_adoption) {
            return false;
        }
        inner.adopting = true;
        true
    }

    /// Transition out of `Pending` and dispatch queued reactions
    pub(crate) fn commit(self: &Arc<Self>, outcome: Result<T, E>, from_adoption: bool) -> bool {
        let mut inner = self.inner.lock();
        if !matches!(inner.state, CellState::Pending) {
            trace!(cell = %self.id, "cell already settled; ignoring settlement");
            return false;
        }
        if inner.adopting && !from_adoption {
            trace!(cell = %self.id, "cell is adopting another result; ignoring settlement");
            return false;
        }

        inner.state = match &outcome {
            Ok(value) => CellState::Fulfilled(value.clone()),
            Err(reason) => CellState::Rejected(reason.clone()),
        };
        inner.adopting = false;
        let reactions = std::mem::take(&mut inner.reactions);
        let unobserved = outcome.is_err() && !inner.handled;
        drop(inner);

        trace!(
            cell = %self.id,
            fulfilled = outcome.is_ok(),
            reactions = reactions.len(),
            "cell settled"
        );
        dispatch::dispatch_all(&self.queue, self.id, reactions, &outcome);
        if unobserved {
            self.track_if_unobserved();
        }
        true
    }

    pub(crate) fn is_pending(&self) -> bool {
        matches!(self.inner.lock().state, CellState::Pending)
    }

    pub(crate) fn is_rejected(&self) -> bool {
        matches!(self.inner.lock().state, CellState::Rejected(_))
    }

    /// Current state without touching the outcome
    pub(crate) fn state_kind(&self) -> DeferredState {
        match self.inner.lock().state {
            CellState::Pending => DeferredState::Pending,
            CellState::Fulfilled(_) => DeferredState::Fulfilled,
            CellState::Rejected(_) => DeferredState::Rejected,
        }
    }

    #[cfg(test)]
    pub(crate) fn is_adopting(&self) -> bool {
        self.inner.lock().adopting
    }

    /// Clone of the outcome, `None` while pending
    pub(crate) fn outcome(&self) -> Option<Result<T, E>> {
        self.inner.lock().state.outcome()
    }

    #[cfg(test)]
    pub(crate) fn reaction_count(&self) -> usize {
        self.inner.lock().reactions.len()
    }

    fn track_if_unobserved(self: &Arc<Self>) {
        let weak: Weak<dyn TrackedRejection> = Arc::downgrade(self) as Weak<dyn TrackedRejection>;
        self.queue.track_rejection(weak);
    }
}

impl<T: Payload, E: Reason> TrackedRejection for SettlementCell<T, E> {
    fn unobserved_reason(&self) -> Option<(CellId, String)> {
        let inner = self.inner.lock();
        match &inner.state {
            CellState::Rejected(reason) if !inner.handled => {
                Some((self.id, format!("{:?}", reason)))
            }
            _ => None,
        }
    }
}
