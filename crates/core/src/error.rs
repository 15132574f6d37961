//! Errors raised by the deferred-result core itself
//!
//! Application rejection reasons are opaque to the core and never pass
//! through this type. `DeferredError` only covers the situations where the
//! core has to invent a reason on its own:
//!
//! | Variant | Raised when |
//! |---------|-------------|
//! | Cycle | a deferred result is resolved with itself |
//! | HandlerPanicked | a continuation panics instead of returning |
//! | OperationPanicked | an adapted completion-style operation panics |
//!
//! Every reason type used with the core must implement `From<DeferredError>`
//! so these can be delivered as ordinary rejections.

use thiserror::Error;

/// Core-generated rejection reasons
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeferredError {
    /// A deferred result was asked to adopt itself
    #[error("chaining cycle detected: deferred result resolved with itself")]
    Cycle,

    /// A continuation panicked while running
    #[error("continuation panicked: {message}")]
    HandlerPanicked {
        /// Panic payload rendered as text
        message: String,
    },

    /// A completion-style operation panicked before completing
    #[error("operation panicked: {message}")]
    OperationPanicked {
        /// Panic payload rendered as text
        message: String,
    },
}

impl DeferredError {
    /// Build a `HandlerPanicked` error from a `catch_unwind` payload
    pub fn handler_panicked(payload: &(dyn std::any::Any + Send)) -> Self {
        DeferredError::HandlerPanicked {
            message: panic_message(payload),
        }
    }

    /// Build an `OperationPanicked` error from a `catch_unwind` payload
    pub fn operation_panicked(payload: &(dyn std::any::Any + Send)) -> Self {
        DeferredError::OperationPanicked {
            message: panic_message(payload),
        }
    }

    /// Check if this is a self-resolution error
    pub fn is_cycle(&self) -> bool {
        matches!(self, DeferredError::Cycle)
    }

    /// Check if this error came from a caught panic
    pub fn is_panic(&self) -> bool {
        matches!(
            self,
            DeferredError::HandlerPanicked { .. } | DeferredError::OperationPanicked { .. }
        )
    }
}

/// Render a panic payload the way the default panic hook does
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}
