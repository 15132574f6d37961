//! Core types for Strata deferred results
//!
//! This crate holds the types shared by every layer:
//! - DeferredError: reasons the core itself produces (cycles, panics)
//! - Value: canonical data carried through session chains

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod value;

pub use error::DeferredError;
pub use value::Value;
