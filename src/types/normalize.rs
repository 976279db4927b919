//! Canonical form of type expressions

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;
use thiserror::Error;

use super::{write_joined, LiteralValue, Origin, TypeHint, TypeVar};

/// A normalized type descriptor.
///
/// Invariants kept by [`normalize`]:
/// - no tag wrappers, no `Optional` (it is a two-member union)
/// - unions are flat, duplicate-free and have at least two members
/// - containers always carry their arguments (`list` is `list[Any]`)
/// - fixed unpacked tuples are spliced into the argument list; the only
///   `Unpacked` arguments left are open-ended ones, at most one per list
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NormType {
    Any,
    Apply { origin: Origin, args: Vec<NormType> },
    Var(TypeVar),
    Unpacked(Box<NormType>),
    Ellipsis,
    Literal(Vec<LiteralValue>),
    Union(Vec<NormType>),
}

impl NormType {
    pub fn apply(origin: Origin, args: Vec<NormType>) -> Self {
        NormType::Apply { origin, args }
    }

    /// Bare model origin, the form shapes are registered under.
    pub fn model(name: impl Into<String>) -> Self {
        NormType::Apply { origin: Origin::Model(name.into()), args: Vec::new() }
    }

    pub fn origin(&self) -> Option<&Origin> {
        match self {
            NormType::Apply { origin, .. } => Some(origin),
            _ => None,
        }
    }

    pub fn args(&self) -> &[NormType] {
        match self {
            NormType::Apply { args, .. } => args,
            _ => &[],
        }
    }

    pub fn model_name(&self) -> Option<&str> {
        match self.origin() {
            Some(Origin::Model(name)) => Some(name),
            _ => None,
        }
    }

    /// Same origin with no arguments.
    pub fn bare(&self) -> NormType {
        match self {
            NormType::Apply { origin, .. } => {
                NormType::Apply { origin: origin.clone(), args: Vec::new() }
            }
            other => other.clone(),
        }
    }
}

/// A tuple argument list of unbounded length.
pub(crate) fn is_open_tuple(args: &[NormType]) -> bool {
    args.iter()
        .any(|a| matches!(a, NormType::Ellipsis | NormType::Unpacked(_)))
}

impl fmt::Display for NormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormType::Any => f.write_str("Any"),
            NormType::Apply { origin: Origin::Tuple, args } if args.is_empty() => {
                f.write_str("tuple[()]")
            }
            NormType::Apply { origin, args } if args.is_empty() => write!(f, "{origin}"),
            NormType::Apply { origin, args } => {
                write!(f, "{origin}[")?;
                write_joined(f, args)?;
                f.write_str("]")
            }
            NormType::Var(var) => write!(f, "{var}"),
            NormType::Unpacked(inner) => write!(f, "*{inner}"),
            NormType::Ellipsis => f.write_str("..."),
            NormType::Literal(values) => {
                f.write_str("Literal[")?;
                write_joined(f, values)?;
                f.write_str("]")
            }
            NormType::Union(members) => {
                f.write_str("Union[")?;
                write_joined(f, members)?;
                f.write_str("]")
            }
        }
    }
}

impl From<&NormType> for TypeHint {
    fn from(ty: &NormType) -> Self {
        match ty {
            NormType::Any => TypeHint::Any,
            NormType::Apply { origin, args } if args.is_empty() && *origin != Origin::Tuple => {
                TypeHint::Origin(origin.clone())
            }
            NormType::Apply { origin, args } => {
                TypeHint::Subscript(origin.clone(), args.iter().map(TypeHint::from).collect())
            }
            NormType::Var(var) => TypeHint::Var(var.clone()),
            NormType::Unpacked(inner) => TypeHint::Unpack(Box::new(inner.as_ref().into())),
            NormType::Ellipsis => TypeHint::Ellipsis,
            NormType::Literal(values) => TypeHint::Literal(values.clone()),
            NormType::Union(members) => {
                TypeHint::Union(members.iter().map(TypeHint::from).collect())
            }
        }
    }
}

impl From<NormType> for TypeHint {
    fn from(ty: NormType) -> Self {
        TypeHint::from(&ty)
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    /// A special form that needs arguments was used bare.
    #[error("{0} must be subscribed")]
    NotSubscribed(String),

    #[error("invalid type {ty}: {reason}")]
    InvalidType { ty: String, reason: String },

    #[error("{origin} expects {expected} type argument(s), got {got}")]
    Arity { origin: String, expected: usize, got: usize },
}

fn invalid(hint: &TypeHint, reason: &str) -> NormalizeError {
    NormalizeError::InvalidType { ty: hint.to_string(), reason: reason.to_string() }
}

// ============================================================================
// Normalization
// ============================================================================

/// Canonicalize a raw type expression.
pub fn normalize(hint: &TypeHint) -> Result<NormType, NormalizeError> {
    match hint {
        TypeHint::Any => Ok(NormType::Any),
        TypeHint::Origin(origin) => Ok(bare(origin)),
        TypeHint::Subscript(origin, args) => subscript(hint, origin, args),
        TypeHint::Var(var) if var.variadic => {
            Err(invalid(hint, "a variadic type variable must be unpacked"))
        }
        TypeHint::Var(var) => Ok(NormType::Var(var.clone())),
        TypeHint::Unpack(_) => Err(invalid(hint, "unpacking is only allowed in an argument list")),
        TypeHint::Ellipsis => Err(invalid(hint, "`...` is only allowed as a tuple argument")),
        TypeHint::Literal(values) => {
            if values.is_empty() {
                return Err(NormalizeError::NotSubscribed("Literal".to_string()));
            }
            let mut unique: Vec<LiteralValue> = Vec::with_capacity(values.len());
            for value in values {
                if !unique.contains(value) {
                    unique.push(value.clone());
                }
            }
            Ok(NormType::Literal(unique))
        }
        TypeHint::Union(members) => {
            if members.is_empty() {
                return Err(NormalizeError::NotSubscribed("Union".to_string()));
            }
            let members = members.iter().map(normalize).collect::<Result<Vec<_>, _>>()?;
            Ok(make_union(members))
        }
        TypeHint::Optional(inner) => {
            Ok(make_union(vec![normalize(inner)?, bare(&Origin::NoneType)]))
        }
        TypeHint::Tagged(_, inner) => normalize(inner),
        TypeHint::Bare(form) => Err(NormalizeError::NotSubscribed(form.to_string())),
    }
}

fn make_union(members: Vec<NormType>) -> NormType {
    let mut flat: Vec<NormType> = Vec::with_capacity(members.len());
    for member in members {
        let parts = match member {
            NormType::Union(inner) => inner,
            other => vec![other],
        };
        for ty in parts {
            if !flat.contains(&ty) {
                flat.push(ty);
            }
        }
    }
    if flat.len() == 1 {
        flat.remove(0)
    } else {
        NormType::Union(flat)
    }
}

fn bare(origin: &Origin) -> NormType {
    let args = match origin {
        Origin::List | Origin::Set | Origin::FrozenSet | Origin::Deque => vec![NormType::Any],
        Origin::Dict => vec![NormType::Any, NormType::Any],
        Origin::Tuple => vec![NormType::Any, NormType::Ellipsis],
        _ => Vec::new(),
    };
    NormType::apply(origin.clone(), args)
}

fn subscript(hint: &TypeHint, origin: &Origin, args: &[TypeHint]) -> Result<NormType, NormalizeError> {
    let args = normalize_args(args)?;
    if *origin != Origin::Tuple && args.contains(&NormType::Ellipsis) {
        return Err(invalid(hint, "`...` is only allowed as a tuple argument"));
    }
    let fixed = |expected: usize| -> Result<(), NormalizeError> {
        if args.iter().any(|a| matches!(a, NormType::Unpacked(_))) {
            return Err(invalid(hint, "unpacking is only allowed for tuple and generic models"));
        }
        if args.len() != expected {
            return Err(NormalizeError::Arity {
                origin: origin.to_string(),
                expected,
                got: args.len(),
            });
        }
        Ok(())
    };
    match origin {
        o if o.is_scalar() => fixed(0)?,
        o if o.is_iterable() => fixed(1)?,
        Origin::Dict => fixed(2)?,
        Origin::Tuple => check_tuple_args(hint, &args)?,
        _ => {}
    }
    Ok(NormType::apply(origin.clone(), args))
}

fn check_tuple_args(hint: &TypeHint, args: &[NormType]) -> Result<(), NormalizeError> {
    match args.iter().position(|a| *a == NormType::Ellipsis) {
        None => Ok(()),
        Some(1) if args.len() == 2 && !matches!(args[0], NormType::Unpacked(_)) => Ok(()),
        Some(_) => Err(invalid(hint, "`...` must follow exactly one item type")),
    }
}

fn normalize_args(args: &[TypeHint]) -> Result<Vec<NormType>, NormalizeError> {
    let mut out = Vec::with_capacity(args.len());
    for arg in args {
        match arg {
            TypeHint::Unpack(inner) => match unpack_target(inner)? {
                NormType::Apply { origin: Origin::Tuple, args } if !is_open_tuple(&args) => {
                    out.extend(args)
                }
                other => {
                    if out.iter().any(|a| matches!(a, NormType::Unpacked(_))) {
                        return Err(invalid(arg, "only one open-ended unpack is allowed per argument list"));
                    }
                    out.push(NormType::Unpacked(Box::new(other)))
                }
            },
            TypeHint::Ellipsis => out.push(NormType::Ellipsis),
            other => out.push(normalize(other)?),
        }
    }
    Ok(out)
}

fn unpack_target(inner: &TypeHint) -> Result<NormType, NormalizeError> {
    match inner {
        TypeHint::Var(var) if var.variadic => Ok(NormType::Var(var.clone())),
        TypeHint::Tagged(_, inner) => unpack_target(inner),
        TypeHint::Origin(Origin::Tuple) | TypeHint::Subscript(Origin::Tuple, _) => normalize(inner),
        other => Err(invalid(other, "only tuples and variadic type variables can be unpacked")),
    }
}

// ============================================================================
// Cache
// ============================================================================

/// Normalizer with a per-owner cache keyed by the raw expression.
#[derive(Debug, Default)]
pub struct TypeNormalizer {
    cache: RwLock<HashMap<TypeHint, NormType>>,
}

impl TypeNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn normalize(&self, hint: &TypeHint) -> Result<NormType, NormalizeError> {
        if let Some(ty) = self.cache.read().get(hint) {
            return Ok(ty.clone());
        }
        let ty = normalize(hint)?;
        self.cache.write().insert(hint.clone(), ty.clone());
        Ok(ty)
    }

    pub fn cached(&self) -> usize {
        self.cache.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SpecialForm, TypeTag};

    fn norm(hint: TypeHint) -> NormType {
        normalize(&hint).expect("normalize")
    }

    #[test]
    fn test_bare_containers_get_any_arguments() {
        assert_eq!(norm(TypeHint::Origin(Origin::List)), norm(TypeHint::list(TypeHint::Any)));
        assert_eq!(
            norm(TypeHint::Origin(Origin::Tuple)),
            norm(TypeHint::tuple_of(TypeHint::Any))
        );
        assert_eq!(norm(TypeHint::Origin(Origin::Dict)).to_string(), "dict[Any, Any]");
    }

    #[test]
    fn test_union_is_flattened_and_deduplicated() {
        let ty = norm(TypeHint::union(vec![
            TypeHint::int(),
            TypeHint::union(vec![TypeHint::str(), TypeHint::int()]),
            TypeHint::optional(TypeHint::str()),
        ]));
        assert_eq!(ty.to_string(), "Union[int, str, None]");
        assert_eq!(norm(TypeHint::union(vec![TypeHint::int(), TypeHint::int()])), norm(TypeHint::int()));
    }

    #[test]
    fn test_tags_are_stripped() {
        let hint = TypeHint::tagged(
            TypeTag::Annotated(vec!["meta".into()]),
            TypeHint::tagged(TypeTag::Final, TypeHint::list(TypeHint::int())),
        );
        assert_eq!(norm(hint), norm(TypeHint::list(TypeHint::int())));
    }

    #[test]
    fn test_fixed_unpack_is_spliced() {
        let hint = TypeHint::tuple(vec![
            TypeHint::int(),
            TypeHint::unpack(TypeHint::tuple(vec![TypeHint::str(), TypeHint::bool()])),
        ]);
        assert_eq!(norm(hint).to_string(), "tuple[int, str, bool]");

        let open = TypeHint::tuple(vec![TypeHint::unpack(TypeHint::tuple_of(TypeHint::str()))]);
        assert_eq!(norm(open).to_string(), "tuple[*tuple[str, ...]]");
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let hints = vec![
            TypeHint::Origin(Origin::Tuple),
            TypeHint::tuple(vec![]),
            TypeHint::optional(TypeHint::dict(TypeHint::str(), TypeHint::Origin(Origin::List))),
            TypeHint::generic("Pair", vec![TypeHint::int(), TypeHint::unpack(TypeHint::tuple_of(TypeHint::str()))]),
            TypeHint::literal(["a", "b", "a"]),
            TypeHint::model("Point"),
        ];
        for hint in hints {
            let once = norm(hint);
            let twice = norm(TypeHint::from(&once));
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_bare_special_forms_are_rejected() {
        assert_eq!(
            normalize(&TypeHint::Bare(SpecialForm::Union)),
            Err(NormalizeError::NotSubscribed("Union".into()))
        );
        assert!(matches!(
            normalize(&TypeHint::Literal(vec![])),
            Err(NormalizeError::NotSubscribed(_))
        ));
    }

    #[test]
    fn test_invalid_expressions() {
        assert!(matches!(
            normalize(&TypeHint::Var(TypeVar::variadic("Ts"))),
            Err(NormalizeError::InvalidType { .. })
        ));
        assert!(matches!(
            normalize(&TypeHint::Subscript(Origin::List, vec![TypeHint::int(), TypeHint::int()])),
            Err(NormalizeError::Arity { expected: 1, got: 2, .. })
        ));
        assert!(matches!(
            normalize(&TypeHint::tuple(vec![
                TypeHint::unpacked_var("Ts"),
                TypeHint::unpack(TypeHint::tuple_of(TypeHint::int())),
            ])),
            Err(NormalizeError::InvalidType { .. })
        ));
        assert!(matches!(
            normalize(&TypeHint::tuple(vec![TypeHint::Ellipsis, TypeHint::int()])),
            Err(NormalizeError::InvalidType { .. })
        ));
    }

    #[test]
    fn test_cache_reuses_results() {
        let normalizer = TypeNormalizer::new();
        let hint = TypeHint::list(TypeHint::int());
        let a = normalizer.normalize(&hint).expect("first");
        let b = normalizer.normalize(&hint).expect("second");
        assert_eq!(a, b);
        assert_eq!(normalizer.cached(), 1);
    }
}
