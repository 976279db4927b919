//! Runtime values

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ConversionError;

/// Coarse runtime kind of a [`Value`], used in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    None,
    Bool,
    Int,
    Float,
    Str,
    List,
    Tuple,
    Set,
    FrozenSet,
    Deque,
    Dict,
    Record,
    Enum,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::None => "None",
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Str => "str",
            ValueType::List => "list",
            ValueType::Tuple => "tuple",
            ValueType::Set => "set",
            ValueType::FrozenSet => "frozenset",
            ValueType::Deque => "deque",
            ValueType::Dict => "dict",
            ValueType::Record => "record",
            ValueType::Enum => "enum",
        };
        f.write_str(name)
    }
}

/// A dynamic value on either side of a conversion.
///
/// `Set`, `FrozenSet` and `Deque` keep their items in a `Vec`: encounter
/// order is preserved and uniqueness is the producer's concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),

    // Sequences
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Set(Vec<Value>),
    FrozenSet(Vec<Value>),
    Deque(Vec<Value>),

    /// Mapping with arbitrary keys, in insertion order
    Dict(Vec<(Value, Value)>),

    /// Instance of a structured model
    Record { type_name: String, fields: Vec<(String, Value)> },

    /// Member of an enum model
    Enum { type_name: String, member: String },
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    /// Build a dict with string keys.
    pub fn dict<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Dict(
            entries
                .into_iter()
                .map(|(k, v)| (Value::Str(k.into()), v))
                .collect(),
        )
    }

    pub fn record<K, I>(type_name: impl Into<String>, fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Record {
            type_name: type_name.into(),
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn kind(&self) -> ValueType {
        match self {
            Value::None => ValueType::None,
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::Str(_) => ValueType::Str,
            Value::List(_) => ValueType::List,
            Value::Tuple(_) => ValueType::Tuple,
            Value::Set(_) => ValueType::Set,
            Value::FrozenSet(_) => ValueType::FrozenSet,
            Value::Deque(_) => ValueType::Deque,
            Value::Dict(_) => ValueType::Dict,
            Value::Record { .. } => ValueType::Record,
            Value::Enum { .. } => ValueType::Enum,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Items of any sequence kind.
    pub fn as_items(&self) -> Option<&[Value]> {
        match self {
            Value::List(items)
            | Value::Tuple(items)
            | Value::Set(items)
            | Value::FrozenSet(items)
            | Value::Deque(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a string key in a dict, or a field in a record.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Dict(entries) => entries
                .iter()
                .find(|(k, _)| k.as_str() == Some(key))
                .map(|(_, v)| v),
            Value::Record { fields, .. } => {
                fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn seq(f: &mut fmt::Formatter<'_>, open: &str, items: &[Value], close: &str) -> fmt::Result {
            f.write_str(open)?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{item}")?;
            }
            f.write_str(close)
        }

        match self {
            Value::None => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::List(items) => seq(f, "[", items, "]"),
            Value::Tuple(items) => seq(f, "(", items, ")"),
            Value::Set(items) => seq(f, "{", items, "}"),
            Value::FrozenSet(items) => seq(f, "frozenset({", items, "})"),
            Value::Deque(items) => seq(f, "deque([", items, "])"),
            Value::Dict(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
            Value::Record { type_name, fields } => {
                write!(f, "{type_name}(")?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}={v}")?;
                }
                f.write_str(")")
            }
            Value::Enum { type_name, member } => write!(f, "{type_name}.{member}"),
        }
    }
}

// ============================================================================
// From implementations for primitives
// ============================================================================

impl From<bool> for Value {
    fn from(v: bool) -> Self { Value::Bool(v) }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self { Value::Int(v.into()) }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self { Value::Int(v.into()) }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self { Value::Int(v.into()) }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self { Value::Int(v) }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self { Value::Int(v.into()) }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self { Value::Int(v.into()) }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self { Value::Int(v.into()) }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self { Value::Float(v.into()) }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self { Value::Float(v) }
}

impl From<String> for Value {
    fn from(v: String) -> Self { Value::Str(v) }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self { Value::Str(String::from(v)) }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(x) => x.into(),
            None => Value::None,
        }
    }
}

impl<T: Into<Value>> From<Box<T>> for Value {
    fn from(v: Box<T>) -> Self {
        (*v).into()
    }
}

impl<V: Into<Value>> From<BTreeMap<String, V>> for Value {
    fn from(v: BTreeMap<String, V>) -> Self {
        Value::dict(v.into_iter().map(|(k, v)| (k, v.into())))
    }
}

// ============================================================================
// TryFrom implementations for primitives
// ============================================================================

fn mismatch(expected: &str, got: &Value) -> ConversionError {
    ConversionError::TypeMismatch {
        expected: String::from(expected),
        got: got.kind(),
    }
}

impl TryFrom<Value> for bool {
    type Error = ConversionError;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Bool(x) => Ok(x),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl TryFrom<Value> for i64 {
    type Error = ConversionError;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Int(x) => Ok(x),
            other => Err(mismatch("int", &other)),
        }
    }
}

impl TryFrom<Value> for i32 {
    type Error = ConversionError;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        let n = i64::try_from(v)?;
        i32::try_from(n).map_err(|_| ConversionError::OutOfRange(n))
    }
}

impl TryFrom<Value> for u32 {
    type Error = ConversionError;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        let n = i64::try_from(v)?;
        u32::try_from(n).map_err(|_| ConversionError::OutOfRange(n))
    }
}

impl TryFrom<Value> for u64 {
    type Error = ConversionError;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        let n = i64::try_from(v)?;
        u64::try_from(n).map_err(|_| ConversionError::OutOfRange(n))
    }
}

impl TryFrom<Value> for usize {
    type Error = ConversionError;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        let n = i64::try_from(v)?;
        usize::try_from(n).map_err(|_| ConversionError::OutOfRange(n))
    }
}

impl TryFrom<Value> for f64 {
    type Error = ConversionError;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Float(x) => Ok(x),
            other => Err(mismatch("float", &other)),
        }
    }
}

impl TryFrom<Value> for String {
    type Error = ConversionError;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Str(x) => Ok(x),
            other => Err(mismatch("str", &other)),
        }
    }
}

impl<T: FromValue> TryFrom<Value> for Vec<T> {
    type Error = ConversionError;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::List(items)
            | Value::Tuple(items)
            | Value::Set(items)
            | Value::FrozenSet(items)
            | Value::Deque(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| {
                    T::from_value(item).map_err(|e| ConversionError::IndexError(i, Box::new(e)))
                })
                .collect(),
            other => Err(mismatch("list", &other)),
        }
    }
}

impl<V: FromValue> TryFrom<Value> for BTreeMap<String, V> {
    type Error = ConversionError;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Dict(entries) => entries
                .into_iter()
                .map(|(k, v)| {
                    let key = String::try_from(k)?;
                    let value = V::from_value(v)
                        .map_err(|e| ConversionError::FieldError(key.clone(), Box::new(e)))?;
                    Ok((key, value))
                })
                .collect(),
            other => Err(mismatch("dict", &other)),
        }
    }
}

// ============================================================================
// FromValue trait - avoids coherence issues with TryFrom for Option<T>
// ============================================================================

/// Trait for converting from a Value.
///
/// Exists beside `TryFrom<Value>` because the blanket
/// `impl<T, U> TryFrom<U> for T where U: Into<T>` rules out a direct
/// `TryFrom<Value> for Option<T>`.
pub trait FromValue: Sized {
    fn from_value(v: Value) -> Result<Self, ConversionError>;
}

impl<T: TryFrom<Value, Error = ConversionError>> FromValue for T {
    fn from_value(v: Value) -> Result<Self, ConversionError> {
        T::try_from(v)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(v: Value) -> Result<Self, ConversionError> {
        match v {
            Value::None => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

// ============================================================================
// Tuple conversions (for common sizes)
// ============================================================================

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Tuple(Vec::new())
    }
}

impl<A: Into<Value>, B: Into<Value>> From<(A, B)> for Value {
    fn from((a, b): (A, B)) -> Self {
        Value::Tuple(vec![a.into(), b.into()])
    }
}

impl<A: FromValue, B: FromValue> TryFrom<Value> for (A, B) {
    type Error = ConversionError;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Tuple(items) | Value::List(items) if items.len() == 2 => {
                let mut items = items.into_iter();
                let a = next_item(&mut items, 0)?;
                let b = next_item(&mut items, 1)?;
                Ok((a, b))
            }
            Value::Tuple(items) | Value::List(items) => Err(ConversionError::WrongItemCount {
                expected: 2,
                got: items.len(),
            }),
            other => Err(mismatch("tuple", &other)),
        }
    }
}

impl<A: Into<Value>, B: Into<Value>, C: Into<Value>> From<(A, B, C)> for Value {
    fn from((a, b, c): (A, B, C)) -> Self {
        Value::Tuple(vec![a.into(), b.into(), c.into()])
    }
}

impl<A: FromValue, B: FromValue, C: FromValue> TryFrom<Value> for (A, B, C) {
    type Error = ConversionError;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Tuple(items) | Value::List(items) if items.len() == 3 => {
                let mut items = items.into_iter();
                let a = next_item(&mut items, 0)?;
                let b = next_item(&mut items, 1)?;
                let c = next_item(&mut items, 2)?;
                Ok((a, b, c))
            }
            Value::Tuple(items) | Value::List(items) => Err(ConversionError::WrongItemCount {
                expected: 3,
                got: items.len(),
            }),
            other => Err(mismatch("tuple", &other)),
        }
    }
}

fn next_item<T: FromValue>(
    items: &mut impl Iterator<Item = Value>,
    index: usize,
) -> Result<T, ConversionError> {
    let item = items.next().ok_or(ConversionError::WrongItemCount {
        expected: index + 1,
        got: index,
    })?;
    T::from_value(item).map_err(|e| ConversionError::IndexError(index, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_maps_to_none() {
        let v: Value = Option::<i64>::None.into();
        assert_eq!(v, Value::None);
        let back: Option<i64> = FromValue::from_value(Value::Int(3)).expect("option");
        assert_eq!(back, Some(3));
    }

    #[test]
    fn test_vec_accepts_any_sequence_kind() {
        let back: Vec<i64> =
            Vec::try_from(Value::Set(vec![Value::Int(1), Value::Int(2)])).expect("vec");
        assert_eq!(back, vec![1, 2]);
    }

    #[test]
    fn test_index_error_carries_position() {
        let err = Vec::<i64>::try_from(Value::List(vec![Value::Int(1), Value::str("x")]))
            .expect_err("should fail");
        match err {
            ConversionError::IndexError(1, inner) => {
                assert!(matches!(*inner, ConversionError::TypeMismatch { .. }))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_get_looks_into_dicts_and_records() {
        let d = Value::dict([("a", Value::Int(1))]);
        assert_eq!(d.get("a"), Some(&Value::Int(1)));
        let r = Value::record("Point", [("x", Value::Int(2))]);
        assert_eq!(r.get("x"), Some(&Value::Int(2)));
        assert_eq!(r.get("y"), None);
    }

    #[test]
    fn test_display_is_python_like() {
        let v = Value::List(vec![Value::None, Value::Bool(true), Value::str("a")]);
        assert_eq!(v.to_string(), "[None, True, \"a\"]");
    }
}
