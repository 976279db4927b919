//! Dynamic values for bindery.
//!
//! One [`Value`] type carries both sides of a conversion: untyped input
//! (the JSON-like subset) and typed output (records, enum members, tuples
//! and sets). Parsers and serializers are functions from `Value` to `Value`,
//! which lets them compose into pipelines.

mod json;
mod value;

pub use value::{FromValue, Value, ValueType};

use thiserror::Error;

/// Errors raised when moving data between Rust types, JSON and [`Value`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: ValueType },

    #[error("missing field {0:?}")]
    MissingField(String),

    #[error("field {0:?}: {1}")]
    FieldError(String, Box<ConversionError>),

    #[error("index {0}: {1}")]
    IndexError(usize, Box<ConversionError>),

    #[error("expected {expected} items, got {got}")]
    WrongItemCount { expected: usize, got: usize },

    #[error("record {got:?} is not a {expected}")]
    WrongRecord { expected: String, got: String },

    #[error("{type_name} has no member {member:?}")]
    UnknownMember { type_name: String, member: String },

    #[error("integer {0} does not fit the target type")]
    OutOfRange(i64),

    #[error("float {0} has no JSON representation")]
    NonFiniteFloat(f64),

    #[error("dict key of type {0} has no JSON representation")]
    NonStringKey(ValueType),
}
