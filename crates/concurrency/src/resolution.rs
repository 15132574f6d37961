//! Resolution procedure: adopt or commit
//!
//! Settling a deferred result with a [`Resolution`] decides between two
//! paths:
//!
//! ```text
//! Value(v)              -> commit: target fulfils with v
//! Adopt(target itself)  -> reject target with DeferredError::Cycle
//! Adopt(source)         -> lock target, subscribe to source,
//!                          re-run this procedure with whatever source
//!                          delivers, or reject with its reason
//! ```
//!
//! Both `Resolver::resolve` and every continuation's return value go
//! through [`resolve`], so nested deferred results flatten into a single
//! eventual settlement no matter where they appear.
//!
//! Any type implementing [`SubscribeCapable`] can be adopted. Foreign
//! implementations are not trusted: only the first callback they invoke
//! counts, and an error returned from `subscribe` after a callback fired is
//! ignored. A `subscribe` that panics before calling back rejects the
//! adopting cell with [`DeferredError::HandlerPanicked`].

use crate::cell::SettlementCell;
use crate::deferred::Deferred;
use crate::{Payload, Reason};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use strata_core::DeferredError;
use tracing::{debug, trace, warn};

/// Callback delivering a nested resolution to an adopting cell
pub type ResolveFn<T, E> = Box<dyn FnOnce(Resolution<T, E>) + Send + 'static>;

/// Callback delivering a rejection reason to an adopting cell
pub type RejectFn<E> = Box<dyn FnOnce(E) + Send + 'static>;

/// Capability of delivering a single eventual outcome to subscribers
///
/// This is the adoption interface: a `Resolution::Adopt` wraps any
/// implementor, and the adopting cell settles with whatever the source
/// delivers. Implementors should call exactly one of the two callbacks,
/// at most once; misbehaving implementors are tolerated.
pub trait SubscribeCapable<T, E>: Send + Sync {
    /// Register callbacks for the eventual outcome
    ///
    /// Returning `Err` before any callback ran rejects the adopting cell
    /// with that reason.
    fn subscribe(&self, on_fulfilled: ResolveFn<T, E>, on_rejected: RejectFn<E>) -> Result<(), E>;

    /// The native deferred result behind this source, if any
    ///
    /// Used for the self-resolution check.
    fn as_deferred(&self) -> Option<&Deferred<T, E>> {
        None
    }
}

/// Value used to settle a deferred result
pub enum Resolution<T, E> {
    /// Plain data: commit as the fulfilment value
    Value(T),
    /// Another deferred result: settle with its eventual outcome
    Adopt(Arc<dyn SubscribeCapable<T, E>>),
}

impl<T, E> Resolution<T, E> {
    /// Plain value resolution
    pub fn value(value: impl Into<T>) -> Self {
        Resolution::Value(value.into())
    }

    /// Adopt the outcome of `source`
    pub fn adopt<S>(source: S) -> Self
    where
        S: SubscribeCapable<T, E> + 'static,
    {
        Resolution::Adopt(Arc::new(source))
    }

    /// Check if this resolution adopts another result
    pub fn is_adopt(&self) -> bool {
        matches!(self, Resolution::Adopt(_))
    }
}

impl<T: Payload, E: Reason> From<Deferred<T, E>> for Resolution<T, E> {
    fn from(deferred: Deferred<T, E>) -> Self {
        Resolution::Adopt(Arc::new(deferred))
    }
}

impl<T: fmt::Debug, E> fmt::Debug for Resolution<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Resolution::Adopt(_) => f.write_str("Adopt(..)"),
        }
    }
}

/// Settle `target` with `resolution`
///
/// `from_adoption` is set only when called from the callbacks of an
/// adoption already in progress on `target`. Returns `false` if the
/// resolution was ignored because the cell is settled or locked.
pub(crate) fn resolve<T: Payload, E: Reason>(
    target: &Arc<SettlementCell<T, E>>,
    resolution: Resolution<T, E>,
    from_adoption: bool,
) -> bool {
    match resolution {
        Resolution::Value(value) => target.commit(Ok(value), from_adoption),
        Resolution::Adopt(source) => {
            let is_self = source
                .as_deferred()
                .is_some_and(|deferred| Arc::ptr_eq(&deferred.cell, target));
            if is_self {
                debug!(cell = %target.id(), "deferred result resolved with itself");
                return target.commit(Err(E::from(DeferredError::Cycle)), from_adoption);
            }
            if !target.begin_adoption(from_adoption) {
                trace!(cell = %target.id(), "adoption ignored; cell settled or locked");
                return false;
            }
            adopt(target, source.as_ref());
            true
        }
    }
}

/// Subscribe `target` to `source`; the adoption lock is already held
fn adopt<T: Payload, E: Reason>(
    target: &Arc<SettlementCell<T, E>>,
    source: &dyn SubscribeCapable<T, E>,
) {
    trace!(cell = %target.id(), "adopting nested deferred result");
    let called = Arc::new(AtomicBool::new(false));

    let on_fulfilled: ResolveFn<T, E> = {
        let target = Arc::clone(target);
        let called = Arc::clone(&called);
        Box::new(move |nested| {
            if !called.swap(true, Ordering::AcqRel) {
                resolve(&target, nested, true);
            }
        })
    };
    let on_rejected: RejectFn<E> = {
        let target = Arc::clone(target);
        let called = Arc::clone(&called);
        Box::new(move |reason| {
            if !called.swap(true, Ordering::AcqRel) {
                target.commit(Err(reason), true);
            }
        })
    };

    match panic::catch_unwind(AssertUnwindSafe(|| source.subscribe(on_fulfilled, on_rejected))) {
        Ok(Ok(())) => {}
        Ok(Err(reason)) => {
            if !called.swap(true, Ordering::AcqRel) {
                debug!(cell = %target.id(), "adopted source failed to subscribe");
                target.commit(Err(reason), true);
            }
        }
        Err(payload) => {
            if !called.swap(true, Ordering::AcqRel) {
                let err = DeferredError::handler_panicked(payload.as_ref());
                warn!(cell = %target.id(), error = %err, "adopted source panicked in subscribe");
                target.commit(Err(E::from(err)), true);
            }
        }
    }
}
