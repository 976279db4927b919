//! Type expressions
//!
//! Two forms exist:
//! - [`TypeHint`]: the raw expression a caller writes. It may carry tag
//!   wrappers (`Final`, `Annotated`, ...), bare containers, nested unions
//!   and unpacked fixed tuples.
//! - [`NormType`]: the canonical form produced by [`normalize`]. Two
//!   descriptors are equal iff they describe the same type, so `NormType`
//!   is the key of every cache and every request.
//!
//! Generic parameters are plain [`TypeVar`]s; a variadic one stands for a
//! whole run of arguments and only ever appears unpacked.

pub mod generics;
mod normalize;

use std::fmt;

use bindery_value::Value;

pub use normalize::{normalize, NormType, NormalizeError, TypeNormalizer};

// ============================================================================
// Origins
// ============================================================================

/// The constructor of a type: a built-in scalar or container, or a model
/// registered under a name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Origin {
    NoneType,
    Bool,
    Int,
    Float,
    Str,
    List,
    Set,
    FrozenSet,
    Deque,
    Tuple,
    Dict,
    Model(String),
}

impl Origin {
    pub fn model(name: impl Into<String>) -> Self {
        Origin::Model(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            Origin::NoneType => "None",
            Origin::Bool => "bool",
            Origin::Int => "int",
            Origin::Float => "float",
            Origin::Str => "str",
            Origin::List => "list",
            Origin::Set => "set",
            Origin::FrozenSet => "frozenset",
            Origin::Deque => "deque",
            Origin::Tuple => "tuple",
            Origin::Dict => "dict",
            Origin::Model(name) => name,
        }
    }

    /// Scalars take no arguments.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Origin::NoneType | Origin::Bool | Origin::Int | Origin::Float | Origin::Str
        )
    }

    /// Single-argument containers.
    pub fn is_iterable(&self) -> bool {
        matches!(
            self,
            Origin::List | Origin::Set | Origin::FrozenSet | Origin::Deque
        )
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Type variables and literals
// ============================================================================

/// A generic parameter. A variadic parameter binds a run of arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeVar {
    pub name: String,
    pub variadic: bool,
}

impl TypeVar {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), variadic: false }
    }

    pub fn variadic(name: impl Into<String>) -> Self {
        Self { name: name.into(), variadic: true }
    }
}

impl fmt::Display for TypeVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A value allowed by a `Literal` type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LiteralValue {
    None,
    Bool(bool),
    Int(i64),
    Str(String),
}

impl LiteralValue {
    pub fn to_value(&self) -> Value {
        match self {
            LiteralValue::None => Value::None,
            LiteralValue::Bool(b) => Value::Bool(*b),
            LiteralValue::Int(n) => Value::Int(*n),
            LiteralValue::Str(s) => Value::Str(s.clone()),
        }
    }

    /// Exact runtime kind and equality: `1` does not match `True`.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (LiteralValue::None, Value::None) => true,
            (LiteralValue::Bool(a), Value::Bool(b)) => a == b,
            (LiteralValue::Int(a), Value::Int(b)) => a == b,
            (LiteralValue::Str(a), Value::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for LiteralValue {
    fn from(v: bool) -> Self { LiteralValue::Bool(v) }
}

impl From<i64> for LiteralValue {
    fn from(v: i64) -> Self { LiteralValue::Int(v) }
}

impl From<&str> for LiteralValue {
    fn from(v: &str) -> Self { LiteralValue::Str(v.to_string()) }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::None => f.write_str("None"),
            LiteralValue::Bool(true) => f.write_str("True"),
            LiteralValue::Bool(false) => f.write_str("False"),
            LiteralValue::Int(n) => write!(f, "{n}"),
            LiteralValue::Str(s) => write!(f, "'{s}'"),
        }
    }
}

// ============================================================================
// Raw type expressions
// ============================================================================

/// Wrappers that carry no meaning for conversion and are stripped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Final,
    ClassVar,
    InitVar,
    Required,
    NotRequired,
    Annotated(Vec<String>),
}

/// Special forms that are only meaningful with arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialForm {
    Union,
    Optional,
    Literal,
    Final,
    ClassVar,
    Annotated,
    Generic,
}

impl fmt::Display for SpecialForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SpecialForm::Union => "Union",
            SpecialForm::Optional => "Optional",
            SpecialForm::Literal => "Literal",
            SpecialForm::Final => "Final",
            SpecialForm::ClassVar => "ClassVar",
            SpecialForm::Annotated => "Annotated",
            SpecialForm::Generic => "Generic",
        };
        f.write_str(name)
    }
}

/// A raw type expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeHint {
    Any,
    /// Origin used without arguments: `int`, `list`, `Point`
    Origin(Origin),
    /// Origin with arguments: `list[int]`, `Pair[int, str]`
    Subscript(Origin, Vec<TypeHint>),
    Var(TypeVar),
    /// `*Ts` or `*tuple[...]`
    Unpack(Box<TypeHint>),
    /// `...` as the last argument of `tuple`
    Ellipsis,
    Literal(Vec<LiteralValue>),
    Union(Vec<TypeHint>),
    Optional(Box<TypeHint>),
    Tagged(TypeTag, Box<TypeHint>),
    /// Special form used without arguments
    Bare(SpecialForm),
}

impl TypeHint {
    pub fn none() -> Self { TypeHint::Origin(Origin::NoneType) }
    pub fn bool() -> Self { TypeHint::Origin(Origin::Bool) }
    pub fn int() -> Self { TypeHint::Origin(Origin::Int) }
    pub fn float() -> Self { TypeHint::Origin(Origin::Float) }
    pub fn str() -> Self { TypeHint::Origin(Origin::Str) }

    pub fn list(inner: TypeHint) -> Self {
        TypeHint::Subscript(Origin::List, vec![inner])
    }

    pub fn set(inner: TypeHint) -> Self {
        TypeHint::Subscript(Origin::Set, vec![inner])
    }

    pub fn frozenset(inner: TypeHint) -> Self {
        TypeHint::Subscript(Origin::FrozenSet, vec![inner])
    }

    pub fn deque(inner: TypeHint) -> Self {
        TypeHint::Subscript(Origin::Deque, vec![inner])
    }

    pub fn dict(key: TypeHint, value: TypeHint) -> Self {
        TypeHint::Subscript(Origin::Dict, vec![key, value])
    }

    /// Fixed-length tuple.
    pub fn tuple(items: Vec<TypeHint>) -> Self {
        TypeHint::Subscript(Origin::Tuple, items)
    }

    /// Homogeneous tuple of any length: `tuple[T, ...]`.
    pub fn tuple_of(item: TypeHint) -> Self {
        TypeHint::Subscript(Origin::Tuple, vec![item, TypeHint::Ellipsis])
    }

    pub fn model(name: impl Into<String>) -> Self {
        TypeHint::Origin(Origin::Model(name.into()))
    }

    /// Parametrized model: `Pair[int, str]`.
    pub fn generic(name: impl Into<String>, args: Vec<TypeHint>) -> Self {
        TypeHint::Subscript(Origin::Model(name.into()), args)
    }

    pub fn var(name: impl Into<String>) -> Self {
        TypeHint::Var(TypeVar::new(name))
    }

    /// `*Ts` for a variadic parameter.
    pub fn unpacked_var(name: impl Into<String>) -> Self {
        TypeHint::Unpack(Box::new(TypeHint::Var(TypeVar::variadic(name))))
    }

    pub fn unpack(inner: TypeHint) -> Self {
        TypeHint::Unpack(Box::new(inner))
    }

    pub fn optional(inner: TypeHint) -> Self {
        TypeHint::Optional(Box::new(inner))
    }

    pub fn union(members: Vec<TypeHint>) -> Self {
        TypeHint::Union(members)
    }

    pub fn literal<I, L>(values: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<LiteralValue>,
    {
        TypeHint::Literal(values.into_iter().map(Into::into).collect())
    }

    pub fn tagged(tag: TypeTag, inner: TypeHint) -> Self {
        TypeHint::Tagged(tag, Box::new(inner))
    }
}

impl fmt::Display for TypeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeHint::Any => f.write_str("Any"),
            TypeHint::Origin(origin) => write!(f, "{origin}"),
            TypeHint::Subscript(origin, args) => {
                write!(f, "{origin}[")?;
                if args.is_empty() {
                    f.write_str("()")?;
                }
                write_joined(f, args)?;
                f.write_str("]")
            }
            TypeHint::Var(var) => write!(f, "{var}"),
            TypeHint::Unpack(inner) => write!(f, "*{inner}"),
            TypeHint::Ellipsis => f.write_str("..."),
            TypeHint::Literal(values) => {
                f.write_str("Literal[")?;
                write_joined(f, values)?;
                f.write_str("]")
            }
            TypeHint::Union(members) => {
                f.write_str("Union[")?;
                write_joined(f, members)?;
                f.write_str("]")
            }
            TypeHint::Optional(inner) => write!(f, "Optional[{inner}]"),
            TypeHint::Tagged(TypeTag::Annotated(meta), inner) => {
                write!(f, "Annotated[{inner}, {}]", meta.join(", "))
            }
            TypeHint::Tagged(tag, inner) => write!(f, "{tag:?}[{inner}]"),
            TypeHint::Bare(form) => write!(f, "{form}"),
        }
    }
}

pub(crate) fn write_joined<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_reads_like_annotations() {
        let hint = TypeHint::dict(TypeHint::str(), TypeHint::optional(TypeHint::list(TypeHint::int())));
        assert_eq!(hint.to_string(), "dict[str, Optional[list[int]]]");
        assert_eq!(TypeHint::tuple(vec![]).to_string(), "tuple[()]");
        assert_eq!(TypeHint::tuple_of(TypeHint::int()).to_string(), "tuple[int, ...]");
    }

    #[test]
    fn test_literal_matches_exact_kind() {
        assert!(LiteralValue::Int(1).matches(&Value::Int(1)));
        assert!(!LiteralValue::Int(1).matches(&Value::Bool(true)));
        assert!(!LiteralValue::Bool(false).matches(&Value::Int(0)));
    }
}
