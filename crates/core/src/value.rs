//! Plain data returned by session continuations
//!
//! A continuation does not have to hand the session on. It may finish the
//! chain with a count, a flag or a short message instead, and `Value` is
//! what carries that result to the next handler.
//!
//! Comparison is strict: variants never compare equal to each other, so
//! `Int(1)` is not `Bool(true)` and `String("1")` is not `Int(1)`.

use serde::{Deserialize, Serialize};

/// Data produced by a continuation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Value {
    /// Nothing to report
    #[default]
    Null,
    /// Flag
    Bool(bool),
    /// Count or identifier
    Int(i64),
    /// Text
    String(String),
}

impl Value {
    /// Variant name, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::String(_) => "String",
        }
    }
}

impl From<bool> for Value {
    fn from(flag: bool) -> Self {
        Value::Bool(flag)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::String(text.to_owned())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::String(text)
    }
}
