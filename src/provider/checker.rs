//! Request checkers: predicates deciding whether a provider applies

use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not};
use std::sync::Arc;

use regex::Regex;

use super::error::{CannotProvide, ConfigError};
use super::request::AnyRequest;
use crate::types::{normalize, NormType, Origin, SpecialForm, TypeHint};

/// Subtype relation between origins.
pub trait TypeHierarchy: Send + Sync {
    fn is_subclass(&self, child: &Origin, parent: &Origin) -> bool;
}

/// Built-in origins only: every origin is its own subclass and `bool` is a
/// subclass of `int`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinHierarchy;

impl TypeHierarchy for BuiltinHierarchy {
    fn is_subclass(&self, child: &Origin, parent: &Origin) -> bool {
        child == parent || (*child == Origin::Bool && *parent == Origin::Int)
    }
}

/// Shape of a type without looking at its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeForm {
    Union,
    Literal,
}

#[derive(Clone)]
pub enum RequestChecker {
    Any,
    ExactFieldName(String),
    FieldNameRegex(Regex),
    ExactType(NormType),
    ExactOrigin(Origin),
    Form(TypeForm),
    Subclass { parent: Origin, hierarchy: Arc<dyn TypeHierarchy> },
    /// Matches the top of the request stack, outermost checker first.
    StackEnd(Vec<RequestChecker>),
    And(Box<RequestChecker>, Box<RequestChecker>),
    Or(Box<RequestChecker>, Box<RequestChecker>),
    Xor(Box<RequestChecker>, Box<RequestChecker>),
    Not(Box<RequestChecker>),
}

impl RequestChecker {
    pub fn subclass_of(parent: Origin, hierarchy: Arc<dyn TypeHierarchy>) -> Self {
        RequestChecker::Subclass { parent, hierarchy }
    }

    /// Check `request`, which sits on top of `stack`.
    pub fn check(&self, stack: &[AnyRequest], request: &AnyRequest) -> Result<(), CannotProvide> {
        let loc = request.loc();
        let refuse = |message: String| -> Result<(), CannotProvide> { Err(CannotProvide::new(message)) };
        match self {
            RequestChecker::Any => Ok(()),
            RequestChecker::ExactFieldName(name) => match loc.field_id() {
                Some(id) if id == name => Ok(()),
                _ => refuse(format!("field name must be {name:?}")),
            },
            RequestChecker::FieldNameRegex(regex) => match loc.field_id() {
                Some(id) if full_match(regex, id) => Ok(()),
                _ => refuse(format!("field name must match {:?}", regex.as_str())),
            },
            RequestChecker::ExactType(ty) if loc.ty == *ty => Ok(()),
            RequestChecker::ExactType(ty) => refuse(format!("type must be {ty}")),
            RequestChecker::ExactOrigin(origin) if loc.ty.origin() == Some(origin) => Ok(()),
            RequestChecker::ExactOrigin(origin) => refuse(format!("origin must be {origin}")),
            RequestChecker::Form(form) => match (form, &loc.ty) {
                (TypeForm::Union, NormType::Union(_)) | (TypeForm::Literal, NormType::Literal(_)) => Ok(()),
                _ => refuse(format!("type must be a {form:?}")),
            },
            RequestChecker::Subclass { parent, hierarchy } => match loc.ty.origin() {
                Some(child) if hierarchy.is_subclass(child, parent) => Ok(()),
                _ => refuse(format!("type must be a subclass of {parent}")),
            },
            RequestChecker::StackEnd(checkers) => {
                if stack.len() < checkers.len() {
                    return refuse("request stack is too short".to_string());
                }
                let offset = stack.len() - checkers.len();
                for (i, checker) in checkers.iter().enumerate() {
                    let depth = offset + i;
                    checker.check(&stack[..=depth], &stack[depth])?;
                }
                Ok(())
            }
            RequestChecker::And(a, b) => {
                a.check(stack, request)?;
                b.check(stack, request)
            }
            RequestChecker::Or(a, b) => match a.check(stack, request) {
                Ok(()) => Ok(()),
                Err(first) => b
                    .check(stack, request)
                    .map_err(|second| CannotProvide::aggregate("no alternative matched", vec![first, second])),
            },
            RequestChecker::Xor(a, b) => {
                match (a.check(stack, request).is_ok(), b.check(stack, request).is_ok()) {
                    (true, false) | (false, true) => Ok(()),
                    _ => refuse("exactly one alternative must match".to_string()),
                }
            }
            RequestChecker::Not(inner) => match inner.check(stack, request) {
                Ok(()) => refuse(format!("request must not match {inner:?}")),
                Err(_) => Ok(()),
            },
        }
    }
}

/// Leftmost-first search can stop at a shorter alternative (`a|ab` finds `a`
/// in `ab`), so a partial hit is retried with the pattern anchored at both ends.
fn full_match(regex: &Regex, text: &str) -> bool {
    match regex.find(text) {
        Some(m) if m.start() == 0 && m.end() == text.len() => true,
        Some(_) => Regex::new(&format!(r"\A(?:{})\z", regex.as_str())).is_ok_and(|r| r.is_match(text)),
        None => false,
    }
}

impl fmt::Debug for RequestChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestChecker::Any => f.write_str("Any"),
            RequestChecker::ExactFieldName(name) => write!(f, "ExactFieldName({name:?})"),
            RequestChecker::FieldNameRegex(regex) => write!(f, "FieldNameRegex({:?})", regex.as_str()),
            RequestChecker::ExactType(ty) => write!(f, "ExactType({ty})"),
            RequestChecker::ExactOrigin(origin) => write!(f, "ExactOrigin({origin})"),
            RequestChecker::Form(form) => write!(f, "Form({form:?})"),
            RequestChecker::Subclass { parent, .. } => write!(f, "Subclass({parent})"),
            RequestChecker::StackEnd(checkers) => f.debug_tuple("StackEnd").field(checkers).finish(),
            RequestChecker::And(a, b) => write!(f, "({a:?} & {b:?})"),
            RequestChecker::Or(a, b) => write!(f, "({a:?} | {b:?})"),
            RequestChecker::Xor(a, b) => write!(f, "({a:?} ^ {b:?})"),
            RequestChecker::Not(inner) => write!(f, "!{inner:?}"),
        }
    }
}

impl BitAnd for RequestChecker {
    type Output = RequestChecker;
    fn bitand(self, rhs: Self) -> Self::Output {
        RequestChecker::And(Box::new(self), Box::new(rhs))
    }
}

impl BitOr for RequestChecker {
    type Output = RequestChecker;
    fn bitor(self, rhs: Self) -> Self::Output {
        RequestChecker::Or(Box::new(self), Box::new(rhs))
    }
}

impl BitXor for RequestChecker {
    type Output = RequestChecker;
    fn bitxor(self, rhs: Self) -> Self::Output {
        RequestChecker::Xor(Box::new(self), Box::new(rhs))
    }
}

impl Not for RequestChecker {
    type Output = RequestChecker;
    fn not(self) -> Self::Output {
        RequestChecker::Not(Box::new(self))
    }
}

// ============================================================================
// Predicates
// ============================================================================

/// Anything a provider can be bound to.
#[derive(Debug, Clone)]
pub enum Pred {
    /// Field name; a string that is not an identifier is a regex
    Name(String),
    Pattern(Regex),
    Type(TypeHint),
    Checker(RequestChecker),
}

impl From<&str> for Pred {
    fn from(s: &str) -> Self {
        Pred::Name(s.to_string())
    }
}

impl From<String> for Pred {
    fn from(s: String) -> Self {
        Pred::Name(s)
    }
}

impl From<Regex> for Pred {
    fn from(r: Regex) -> Self {
        Pred::Pattern(r)
    }
}

impl From<TypeHint> for Pred {
    fn from(t: TypeHint) -> Self {
        Pred::Type(t)
    }
}

impl From<RequestChecker> for Pred {
    fn from(c: RequestChecker) -> Self {
        Pred::Checker(c)
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_alphanumeric())
}

/// Build a checker from a predicate.
///
/// A bare origin matches every parametrization of it; a bare `Union` or
/// `Literal` matches every union or literal type. Type variables are not
/// valid predicates.
pub fn create_request_checker(pred: impl Into<Pred>) -> Result<RequestChecker, ConfigError> {
    match pred.into() {
        Pred::Name(name) if is_identifier(&name) => Ok(RequestChecker::ExactFieldName(name)),
        Pred::Name(pattern) => Regex::new(&pattern)
            .map(RequestChecker::FieldNameRegex)
            .map_err(|e| ConfigError::InvalidPredicate(e.to_string())),
        Pred::Pattern(regex) => Ok(RequestChecker::FieldNameRegex(regex)),
        Pred::Checker(checker) => Ok(checker),
        Pred::Type(hint) => type_checker(&hint),
    }
}

fn type_checker(hint: &TypeHint) -> Result<RequestChecker, ConfigError> {
    match hint {
        TypeHint::Var(var) => Err(ConfigError::InvalidPredicate(format!(
            "type variable {var} can not be used as a predicate"
        ))),
        TypeHint::Tagged(_, inner) => type_checker(inner),
        TypeHint::Origin(origin) => Ok(RequestChecker::ExactOrigin(origin.clone())),
        TypeHint::Bare(SpecialForm::Union | SpecialForm::Optional) => Ok(RequestChecker::Form(TypeForm::Union)),
        TypeHint::Bare(SpecialForm::Literal) => Ok(RequestChecker::Form(TypeForm::Literal)),
        other => Ok(RequestChecker::ExactType(normalize(other)?)),
    }
}
