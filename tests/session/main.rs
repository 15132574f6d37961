//! Session Integration Tests
//!
//! Opening sessions through the client and chaining continuations on the
//! result: fulfilment, rejection, chaining, callback mode and config.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test session
//! cargo test --test session chaining::
//! ```

#[path = "../common/mod.rs"]
mod common;

mod callback_mode;
mod chaining;
mod config;
mod fulfilment;
mod rejection;
