//! Resolution errors

use std::fmt;

use thiserror::Error;

use super::request::RequestKind;
use crate::pipeline::Path;
use crate::types::NormalizeError;

/// A provider declined a request.
///
/// Failures of a whole provider chain aggregate the failures of each
/// provider as `sub_errors`. Only demonstrative errors (those that carry a
/// message) are shown; a provider that simply does not handle a request
/// kind produces a silent one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CannotProvide {
    message: Option<String>,
    sub_errors: Vec<CannotProvide>,
    is_demonstrative: bool,
}

impl CannotProvide {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            sub_errors: Vec::new(),
            is_demonstrative: true,
        }
    }

    /// Silent refusal for requests a provider does not handle.
    pub fn unsupported() -> Self {
        Self::default()
    }

    pub fn aggregate(message: impl Into<String>, sub_errors: Vec<CannotProvide>) -> Self {
        let sub_errors: Vec<_> = sub_errors.into_iter().filter(|e| e.is_demonstrative).collect();
        Self {
            message: Some(message.into()),
            sub_errors,
            is_demonstrative: true,
        }
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn sub_errors(&self) -> &[CannotProvide] {
        &self.sub_errors
    }

    pub fn is_demonstrative(&self) -> bool {
        self.is_demonstrative
    }

    /// Depth-first search for a message.
    pub fn mentions(&self, needle: &str) -> bool {
        self.message.as_deref().is_some_and(|m| m.contains(needle))
            || self.sub_errors.iter().any(|e| e.mentions(needle))
    }

    fn write_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        match &self.message {
            Some(message) => write!(f, "{indent}{message}")?,
            None => write!(f, "{indent}cannot provide")?,
        }
        for sub in &self.sub_errors {
            writeln!(f)?;
            sub.write_tree(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for CannotProvide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_tree(f, 0)
    }
}

impl std::error::Error for CannotProvide {}

/// Invalid configuration, found while building a routine. Never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error("field {field:?} is mapped by more than one crown leaf")]
    DuplicateField { field: String },

    #[error("path {path} is used more than once")]
    DuplicatePath { path: Path },

    #[error("path {path} is both a leaf and a container")]
    PathConflict { path: Path },

    #[error("crown level at {path} mixes keys and indices")]
    InconsistentPath { path: Path },

    #[error("extra target {field:?} is referenced inside the crown")]
    ExtraTargetInCrown { field: String },

    #[error("extra target {field:?} is not a field of {ty}")]
    UnknownExtraTarget { field: String, ty: String },

    #[error("cannot collect extra data of {ty}: constructor has no kwargs parameter")]
    NoKwargs { ty: String },

    #[error("required field {field:?} follows an optional field in a list crown")]
    RequiredAfterOptional { field: String },

    #[error("required fields {fields:?} of {ty} are not mapped")]
    SkippedRequired { ty: String, fields: Vec<String> },

    #[error("layout references unknown field {field:?} of {ty}")]
    UnknownField { field: String, ty: String },

    #[error("can not convert name {name:?} that does not follow snake_case")]
    NotSnakeCase { name: String },

    #[error("invalid name layout for {ty}: {reason}")]
    InvalidLayout { ty: String, reason: String },

    #[error("expected a {expected} provision, got {got}")]
    ProvisionMismatch { expected: RequestKind, got: RequestKind },

    #[error("invalid predicate: {0}")]
    InvalidPredicate(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProvideError {
    #[error(transparent)]
    Cannot(#[from] CannotProvide),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<NormalizeError> for ProvideError {
    fn from(e: NormalizeError) -> Self {
        ProvideError::Config(ConfigError::Normalize(e))
    }
}

pub type ProvideResult<T> = Result<T, ProvideError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_keeps_only_demonstrative_errors() {
        let err = CannotProvide::aggregate(
            "no parser for int",
            vec![CannotProvide::unsupported(), CannotProvide::new("field name must be `a`")],
        );
        assert_eq!(err.sub_errors().len(), 1);
        assert_eq!(err.to_string(), "no parser for int\n  field name must be `a`");
        assert!(err.mentions("`a`"));
    }
}
