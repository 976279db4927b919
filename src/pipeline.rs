//! Compiled conversion routines and their runtime errors
//!
//! A [`Parser`] turns untyped input into a typed value, a [`Serializer`]
//! does the reverse. Both are plain shared closures over [`Value`], so a
//! pipeline is just function composition.

use std::fmt;
use std::sync::Arc;

use bindery_value::{Value, ValueType};
use thiserror::Error;

use crate::types::LiteralValue;

pub type Parser = Arc<dyn Fn(&Value) -> Result<Value, ParseError> + Send + Sync>;
pub type Serializer = Arc<dyn Fn(&Value) -> Result<Value, SerializeError> + Send + Sync>;

pub fn parser<F>(f: F) -> Parser
where
    F: Fn(&Value) -> Result<Value, ParseError> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub fn serializer<F>(f: F) -> Serializer
where
    F: Fn(&Value) -> Result<Value, SerializeError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Apply parser steps left to right.
pub fn parser_pipeline(steps: Vec<Parser>) -> Parser {
    if steps.len() == 1 {
        return steps[0].clone();
    }
    Arc::new(move |data| {
        let mut current = data.clone();
        for step in &steps {
            current = step(&current)?;
        }
        Ok(current)
    })
}

/// Apply serializer steps left to right.
pub fn serializer_pipeline(steps: Vec<Serializer>) -> Serializer {
    if steps.len() == 1 {
        return steps[0].clone();
    }
    Arc::new(move |data| {
        let mut current = data.clone();
        for step in &steps {
            current = step(&current)?;
        }
        Ok(current)
    })
}

// ============================================================================
// Paths
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathElement {
    Key(String),
    Index(usize),
}

impl From<&str> for PathElement {
    fn from(key: &str) -> Self {
        PathElement::Key(key.to_string())
    }
}

impl From<String> for PathElement {
    fn from(key: String) -> Self {
        PathElement::Key(key)
    }
}

impl From<usize> for PathElement {
    fn from(index: usize) -> Self {
        PathElement::Index(index)
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathElement::Key(key) => write!(f, "{key:?}"),
            PathElement::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Location of a value inside the input, root first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path(pub Vec<PathElement>);

impl Path {
    pub fn new<I, E>(elements: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<PathElement>,
    {
        Path(elements.into_iter().map(Into::into).collect())
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.0
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, element) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{element}")?;
        }
        f.write_str("]")
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: ValueType },

    #[error("invalid value: {message}")]
    InvalidValue { message: String },

    #[error("missing required field {field:?}")]
    MissingField { field: String },

    #[error("unexpected fields {fields:?}")]
    ExtraFields { fields: Vec<String> },

    #[error("expected at most {expected} items, got {got}")]
    ExtraItems { expected: usize, got: usize },

    #[error("expected {expected} items, got {got}")]
    ItemCount { expected: String, got: usize },

    #[error("{value} is not one of {allowed:?}")]
    NotLiteral { value: Value, allowed: Vec<LiteralValue> },

    #[error("no union member accepted the value ({} attempts)", errors.len())]
    Union { errors: Vec<ParseError> },

    #[error("recursive parser was called before resolution finished")]
    Unsaturated,

    #[error("at {path}: {source}")]
    At { path: Path, source: Box<ParseError> },
}

impl ParseError {
    pub fn mismatch(expected: impl Into<String>, got: &Value) -> Self {
        ParseError::TypeMismatch { expected: expected.into(), got: got.kind() }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ParseError::InvalidValue { message: message.into() }
    }

    /// Prepend a path segment.
    pub fn at(self, element: impl Into<PathElement>) -> Self {
        match self {
            ParseError::At { mut path, source } => {
                path.0.insert(0, element.into());
                ParseError::At { path, source }
            }
            other => ParseError::At {
                path: Path(vec![element.into()]),
                source: Box::new(other),
            },
        }
    }

    /// [`at`](Self::at) when paths are tracked, else unchanged.
    pub fn at_if(self, track: bool, element: impl Into<PathElement>) -> Self {
        if track {
            self.at(element)
        } else {
            self
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            ParseError::At { path, .. } => Some(path),
            _ => None,
        }
    }

    /// The error without its location.
    pub fn cause(&self) -> &ParseError {
        match self {
            ParseError::At { source, .. } => source,
            other => other,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SerializeError {
    #[error("expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: ValueType },

    #[error("invalid value: {message}")]
    InvalidValue { message: String },

    #[error("value has no field {field:?}")]
    MissingField { field: String },

    #[error("no union member accepted the value ({} attempts)", errors.len())]
    Union { errors: Vec<SerializeError> },

    #[error("recursive serializer was called before resolution finished")]
    Unsaturated,

    #[error("at {path}: {source}")]
    At { path: Path, source: Box<SerializeError> },
}

impl SerializeError {
    pub fn mismatch(expected: impl Into<String>, got: &Value) -> Self {
        SerializeError::TypeMismatch { expected: expected.into(), got: got.kind() }
    }

    pub fn at(self, element: impl Into<PathElement>) -> Self {
        match self {
            SerializeError::At { mut path, source } => {
                path.0.insert(0, element.into());
                SerializeError::At { path, source }
            }
            other => SerializeError::At {
                path: Path(vec![element.into()]),
                source: Box::new(other),
            },
        }
    }

    pub fn at_if(self, track: bool, element: impl Into<PathElement>) -> Self {
        if track {
            self.at(element)
        } else {
            self
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            SerializeError::At { path, .. } => Some(path),
            _ => None,
        }
    }

    pub fn cause(&self) -> &SerializeError {
        match self {
            SerializeError::At { source, .. } => source,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_accumulate_root_first() {
        let err = ParseError::MissingField { field: "c".into() }.at("b").at("a");
        assert_eq!(err.path(), Some(&Path::new(["a", "b"])));
        assert_eq!(err.cause(), &ParseError::MissingField { field: "c".into() });
        assert_eq!(err.to_string(), "at [\"a\", \"b\"]: missing required field \"c\"");
    }

    #[test]
    fn test_pipeline_feeds_each_step() {
        let inc = parser(|v| match v {
            Value::Int(n) => Ok(Value::Int(n + 1)),
            other => Err(ParseError::mismatch("int", other)),
        });
        let pipeline = parser_pipeline(vec![inc.clone(), inc.clone(), inc]);
        assert_eq!(pipeline(&Value::Int(0)).expect("parse"), Value::Int(3));
    }
}
