//! Deferred task queue
//!
//! Every continuation the core runs goes through a `TaskQueue`: reactions
//! are never invoked inside the call that registered or settled them, they
//! are enqueued and run later by an explicit drain.
//!
//! ## Semantics
//!
//! - FIFO: tasks run in the order they were enqueued
//! - Tasks enqueued while draining run in the same drain
//! - A drain started from inside a running task is a no-op, so a task
//!   always runs to completion before the next one starts
//!
//! Each deferred result remembers the queue it was created on. Tests create
//! their own queue for isolation; applications can share the process-wide
//! instance returned by [`TaskQueue::global`].

use crate::cell::CellId;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

/// A unit of deferred work
pub type Task = Box<dyn FnOnce() + Send + 'static>;

static GLOBAL_QUEUE: Lazy<TaskQueue> = Lazy::new(TaskQueue::new);

/// Extension point notified about rejections nobody observed
///
/// At the end of each drain the queue reports every deferred result that
/// was rejected while it had no reaction attached and still has none. The
/// default implementation ignores the report.
pub trait RejectionObserver: Send + Sync {
    /// Called once per unobserved rejection
    fn unhandled_rejection(&self, cell: CellId, reason: &str) {
        let _ = (cell, reason);
    }
}

/// A rejected cell that may still gain an observer before the drain ends
pub(crate) trait TrackedRejection: Send + Sync {
    /// Rendered reason if the cell is still rejected with nothing attached
    fn unobserved_reason(&self) -> Option<(CellId, String)>;
}

struct QueueInner {
    tasks: Mutex<VecDeque<Task>>,
    draining: AtomicBool,
    executed: AtomicU64,
    observer: Mutex<Option<Arc<dyn RejectionObserver>>>,
    unobserved: Mutex<Vec<Weak<dyn TrackedRejection>>>,
}

/// FIFO of scheduled continuations
///
/// Cloning a `TaskQueue` produces another handle to the same queue.
#[derive(Clone)]
pub struct TaskQueue {
    inner: Arc<QueueInner>,
}

/// Clears the draining flag even if a task unwinds
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl TaskQueue {
    /// Create an empty, independent queue
    pub fn new() -> Self {
        TaskQueue {
            inner: Arc::new(QueueInner {
                tasks: Mutex::new(VecDeque::new()),
                draining: AtomicBool::new(false),
                executed: AtomicU64::new(0),
                observer: Mutex::new(None),
                unobserved: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Handle to the process-wide default queue
    pub fn global() -> Self {
        GLOBAL_QUEUE.clone()
    }

    /// Append a task to the back of the queue
    pub fn enqueue<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.tasks.lock().push_back(Box::new(task));
    }

    /// Number of tasks waiting to run
    pub fn len(&self) -> usize {
        self.inner.tasks.lock().len()
    }

    /// Check if no task is waiting
    pub fn is_empty(&self) -> bool {
        self.inner.tasks.lock().is_empty()
    }

    /// Total number of tasks run by this queue since creation
    pub fn executed(&self) -> u64 {
        self.inner.executed.load(Ordering::Relaxed)
    }

    /// Check if a drain is in progress
    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::Acquire)
    }

    /// Check if two handles refer to the same queue
    pub fn same_queue(&self, other: &TaskQueue) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Run tasks until the queue is empty
    ///
    /// Returns the number of tasks run. Returns 0 without running anything
    /// when called while a drain is already in progress.
    pub fn run_until_idle(&self) -> usize {
        if self.inner.draining.swap(true, Ordering::AcqRel) {
            trace!("drain requested while draining; ignoring");
            return 0;
        }
        let _guard = DrainGuard(&self.inner.draining);

        let mut ran = 0;
        loop {
            // Lock released before the task runs so it can enqueue more work
            let next = self.inner.tasks.lock().pop_front();
            match next {
                Some(task) => {
                    task();
                    ran += 1;
                    self.inner.executed.fetch_add(1, Ordering::Relaxed);
                }
                None => break,
            }
        }

        if ran > 0 {
            trace!(tasks = ran, "queue drained");
        }
        self.report_unobserved();
        ran
    }

    /// Run only the task at the front of the queue
    ///
    /// Returns `false` if the queue was empty or a drain is in progress.
    /// A step that leaves the queue empty ends the drain, so unobserved
    /// rejections are reported exactly as after [`TaskQueue::run_until_idle`].
    pub fn run_one(&self) -> bool {
        if self.inner.draining.swap(true, Ordering::AcqRel) {
            return false;
        }
        let _guard = DrainGuard(&self.inner.draining);

        let next = self.inner.tasks.lock().pop_front();
        let ran = match next {
            Some(task) => {
                task();
                self.inner.executed.fetch_add(1, Ordering::Relaxed);
                true
            }
            None => false,
        };
        if self.is_empty() {
            self.report_unobserved();
        }
        ran
    }

    /// Install the observer notified about unobserved rejections
    pub fn set_rejection_observer(&self, observer: Arc<dyn RejectionObserver>) {
        *self.inner.observer.lock() = Some(observer);
    }

    /// Remove the installed rejection observer
    pub fn clear_rejection_observer(&self) {
        *self.inner.observer.lock() = None;
    }

    pub(crate) fn track_rejection(&self, cell: Weak<dyn TrackedRejection>) {
        self.inner.unobserved.lock().push(cell);
    }

    fn report_unobserved(&self) {
        let tracked = std::mem::take(&mut *self.inner.unobserved.lock());
        if tracked.is_empty() {
            return;
        }
        let observer = self.inner.observer.lock().clone();
        for cell in tracked {
            let Some(cell) = cell.upgrade() else {
                continue;
            };
            if let Some((id, reason)) = cell.unobserved_reason() {
                debug!(cell = %id, reason = %reason, "rejection has no handler attached");
                if let Some(observer) = &observer {
                    observer.unhandled_rejection(id, &reason);
                }
            }
        }
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("pending", &self.len())
            .field("executed", &self.executed())
            .field("draining", &self.is_draining())
            .finish()
    }
}
