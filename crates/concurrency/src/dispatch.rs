//! Reaction dispatcher
//!
//! Turns the reactions of a settled cell into queued tasks, one per
//! reaction, in subscription order. When a task runs it:
//!
//! 1. Picks `on_fulfilled` or `on_rejected` according to the outcome
//! 2. With no handler, passes the outcome through to the derived cell
//! 3. Otherwise calls the handler with the value or reason as its only
//!    argument and settles the derived cell from what it returns:
//!    - `Ok(resolution)` goes through the resolution procedure
//!    - `Err(reason)` rejects the derived cell
//!    - a panic is caught and becomes `DeferredError::HandlerPanicked`

use crate::cell::{CellId, Reaction};
use crate::deferred::{HandlerResult, Resolver};
use crate::queue::TaskQueue;
use crate::resolution::Resolution;
use crate::{Payload, Reason};
use smallvec::SmallVec;
use std::panic::{self, AssertUnwindSafe};
use strata_core::DeferredError;
use tracing::{trace, warn};

/// Queue every reaction of a freshly settled cell
pub(crate) fn dispatch_all<T: Payload, E: Reason>(
    queue: &TaskQueue,
    cell: CellId,
    reactions: SmallVec<[Reaction<T, E>; 2]>,
    outcome: &Result<T, E>,
) {
    for reaction in reactions {
        schedule(queue, cell, reaction, outcome.clone());
    }
}

/// Queue a single reaction against a known outcome
pub(crate) fn schedule<T: Payload, E: Reason>(
    queue: &TaskQueue,
    cell: CellId,
    reaction: Reaction<T, E>,
    outcome: Result<T, E>,
) {
    queue.enqueue(move || run_reaction(cell, reaction, outcome));
}

fn run_reaction<T: Payload, E: Reason>(cell: CellId, reaction: Reaction<T, E>, outcome: Result<T, E>) {
    match reaction {
        Reaction::Chain {
            on_fulfilled,
            on_rejected,
            derived,
        } => {
            trace!(cell = %cell, derived = %derived.id(), "running chained reaction");
            match outcome {
                Ok(value) => match on_fulfilled {
                    Some(handler) => invoke(cell, handler, value, &derived),
                    None => {
                        derived.resolve(Resolution::Value(value));
                    }
                },
                Err(reason) => match on_rejected {
                    Some(handler) => invoke(cell, handler, reason, &derived),
                    None => {
                        derived.reject(reason);
                    }
                },
            }
        }
        Reaction::Observe {
            on_fulfilled,
            on_rejected,
        } => match outcome {
            Ok(value) => on_fulfilled(Resolution::Value(value)),
            Err(reason) => on_rejected(reason),
        },
    }
}

fn invoke<A, T: Payload, E: Reason>(
    cell: CellId,
    handler: Box<dyn FnOnce(A) -> HandlerResult<T, E> + Send>,
    arg: A,
    derived: &Resolver<T, E>,
) {
    match panic::catch_unwind(AssertUnwindSafe(move || handler(arg))) {
        Ok(Ok(resolution)) => {
            derived.resolve(resolution);
        }
        Ok(Err(reason)) => {
            trace!(cell = %cell, derived = %derived.id(), "continuation returned an error");
            derived.reject(reason);
        }
        Err(payload) => {
            let err = DeferredError::handler_panicked(payload.as_ref());
            warn!(cell = %cell, derived = %derived.id(), error = %err, "continuation panicked");
            derived.reject(E::from(err));
        }
    }
}
