//! Completion-style operation adapter
//!
//! Bridges an external operation that reports through a pair of callbacks
//! ("call exactly one of success(value) or failure(reason), once") into a
//! fresh deferred result.
//!
//! ```ignore
//! let session = from_completion(&queue, |completion| {
//!     let on_error = completion.clone();
//!     factory.connect(
//!         &properties,
//!         move |s| completion.success(s),
//!         move |e| on_error.failure(e),
//!     );
//! });
//! ```
//!
//! A source that fires twice (or fires both callbacks) is absorbed: the
//! first firing settles the result and later ones only log a warning. A
//! source that never fires leaves the result pending forever.

use crate::cell::CellId;
use crate::deferred::{Deferred, Resolver};
use crate::queue::TaskQueue;
use crate::{Payload, Reason};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use strata_core::DeferredError;
use tracing::{debug, warn};

/// Shared firing counter; reports a silent source when the last handle goes
struct FiringLog {
    cell: CellId,
    fired: AtomicUsize,
}

impl Drop for FiringLog {
    fn drop(&mut self) {
        if self.fired.load(Ordering::Acquire) == 0 {
            debug!(cell = %self.cell, "completion dropped without firing; result stays pending");
        }
    }
}

/// Callback pair handed to a completion-style operation
///
/// All clones settle the same result.
pub struct Completion<T, E> {
    resolver: Resolver<T, E>,
    log: Arc<FiringLog>,
}

impl<T: Payload, E: Reason> Completion<T, E> {
    fn new(resolver: Resolver<T, E>) -> Self {
        let log = Arc::new(FiringLog {
            cell: resolver.id(),
            fired: AtomicUsize::new(0),
        });
        Completion { resolver, log }
    }

    /// Report success
    pub fn success(&self, value: T) {
        self.fire("success", Ok(value));
    }

    /// Report failure
    pub fn failure(&self, reason: E) {
        self.fire("failure", Err(reason));
    }

    /// Report a `Result`
    pub fn complete(&self, result: Result<T, E>) {
        match result {
            Ok(value) => self.success(value),
            Err(reason) => self.failure(reason),
        }
    }

    /// Number of times any clone of this completion fired
    pub fn times_fired(&self) -> usize {
        self.log.fired.load(Ordering::Acquire)
    }

    /// Check if the result has been settled through this completion
    pub fn is_fired(&self) -> bool {
        self.times_fired() > 0
    }

    /// Split into independent success and failure callbacks
    pub fn into_callbacks(self) -> (impl Fn(T) + Send + Sync, impl Fn(E) + Send + Sync) {
        let on_failure = self.clone();
        (
            move |value| self.success(value),
            move |reason| on_failure.failure(reason),
        )
    }

    fn fire(&self, callback: &'static str, outcome: Result<T, E>) {
        let previous = self.log.fired.fetch_add(1, Ordering::AcqRel);
        let accepted = match outcome {
            Ok(value) => self.resolver.fulfill(value),
            Err(reason) => self.resolver.reject(reason),
        };
        if previous > 0 || !accepted {
            warn!(
                cell = %self.log.cell,
                callback,
                calls = previous + 1,
                "completion fired after the result settled; ignoring"
            );
        }
    }
}

impl<T, E> Clone for Completion<T, E> {
    fn clone(&self) -> Self {
        Completion {
            resolver: self.resolver.clone(),
            log: Arc::clone(&self.log),
        }
    }
}

impl<T, E> fmt::Debug for Completion<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("cell", &self.log.cell)
            .field("fired", &self.log.fired.load(Ordering::Acquire))
            .finish()
    }
}

/// Run a completion-style operation and return its deferred result
///
/// `operation` runs immediately and receives the completion handle. It may
/// fire synchronously, later from another task, or from another thread.
/// A panic inside `operation` rejects the result with
/// `DeferredError::OperationPanicked` unless it already fired.
pub fn from_completion<T, E, F>(queue: &TaskQueue, operation: F) -> Deferred<T, E>
where
    T: Payload,
    E: Reason,
    F: FnOnce(Completion<T, E>),
{
    let (deferred, resolver) = Deferred::pending(queue);
    let completion = Completion::new(resolver.clone());
    let watcher = completion.clone();

    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(move || operation(completion))) {
        let err = DeferredError::operation_panicked(payload.as_ref());
        warn!(cell = %deferred.id(), error = %err, "completion-style operation panicked");
        if !watcher.is_fired() {
            watcher.log.fired.fetch_add(1, Ordering::AcqRel);
            resolver.reject(E::from(err));
        }
    }
    deferred
}
