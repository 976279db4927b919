//! Binding generic parameters to arguments
//!
//! A parametrized model `Pair[int, str]` binds the declared parameters of
//! `Pair` positionally. A variadic parameter collects the middle of the
//! argument list: the fixed prefix goes to the parameters declared before
//! it, the fixed suffix to those declared after it.

use std::collections::{HashMap, VecDeque};

use super::normalize::{normalize, NormType, NormalizeError};
use super::{Origin, TypeHint, TypeVar};

#[derive(Debug, Clone, PartialEq)]
enum Binding {
    Single(NormType),
    Run(Vec<NormType>),
}

/// Parameter to argument assignment for one parametrized origin.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    map: HashMap<TypeVar, Binding>,
}

/// `*tuple[Any, ...]`, the value of an unbound variadic parameter.
fn any_run() -> NormType {
    NormType::Unpacked(Box::new(NormType::apply(
        Origin::Tuple,
        vec![NormType::Any, NormType::Ellipsis],
    )))
}

impl Bindings {
    /// Bind `params` to `args`. No arguments at all means the origin was
    /// used bare, and every parameter becomes `Any`.
    pub fn bind(origin: &str, params: &[TypeVar], args: &[NormType]) -> Result<Self, NormalizeError> {
        let mut map = HashMap::new();

        if args.is_empty() {
            for param in params {
                let binding = if param.variadic {
                    Binding::Run(vec![any_run()])
                } else {
                    Binding::Single(NormType::Any)
                };
                map.insert(param.clone(), binding);
            }
            return Ok(Self { map });
        }

        let arity = |expected: usize| NormalizeError::Arity {
            origin: origin.to_string(),
            expected,
            got: args.len(),
        };

        match params.iter().position(|p| p.variadic) {
            None => {
                if args.iter().any(|a| matches!(a, NormType::Unpacked(_))) {
                    return Err(NormalizeError::InvalidType {
                        ty: origin.to_string(),
                        reason: "cannot unpack into non-variadic parameters".to_string(),
                    });
                }
                if args.len() != params.len() {
                    return Err(arity(params.len()));
                }
                for (param, arg) in params.iter().zip(args) {
                    map.insert(param.clone(), Binding::Single(arg.clone()));
                }
            }
            Some(split) => {
                let plain = params.len() - 1;
                let mut rest: VecDeque<NormType> = args.iter().cloned().collect();
                for param in &params[..split] {
                    let arg = take(&mut rest, true, origin).ok_or_else(|| arity(plain))??;
                    map.insert(param.clone(), Binding::Single(arg));
                }
                for param in params[split + 1..].iter().rev() {
                    let arg = take(&mut rest, false, origin).ok_or_else(|| arity(plain))??;
                    map.insert(param.clone(), Binding::Single(arg));
                }
                map.insert(params[split].clone(), Binding::Run(rest.into()));
            }
        }
        Ok(Self { map })
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Replace bound parameters in `ty` and normalize the result.
    pub fn substitute(&self, ty: &NormType) -> Result<NormType, NormalizeError> {
        if self.map.is_empty() {
            return Ok(ty.clone());
        }
        normalize(&self.replace(ty))
    }

    fn replace(&self, ty: &NormType) -> TypeHint {
        match ty {
            NormType::Var(var) => match self.map.get(var) {
                Some(Binding::Single(bound)) => bound.into(),
                _ => TypeHint::Var(var.clone()),
            },
            NormType::Apply { origin, args } if args.is_empty() && *origin != Origin::Tuple => {
                TypeHint::Origin(origin.clone())
            }
            NormType::Apply { origin, args } => {
                TypeHint::Subscript(origin.clone(), self.replace_args(args))
            }
            NormType::Unpacked(inner) => TypeHint::Unpack(Box::new(self.replace(inner))),
            NormType::Union(members) => {
                TypeHint::Union(members.iter().map(|m| self.replace(m)).collect())
            }
            other => other.into(),
        }
    }

    fn replace_args(&self, args: &[NormType]) -> Vec<TypeHint> {
        let mut out = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                NormType::Unpacked(inner) => match inner.as_ref() {
                    NormType::Var(var) => match self.map.get(var) {
                        Some(Binding::Run(items)) => out.extend(items.iter().map(TypeHint::from)),
                        _ => out.push(self.replace(arg)),
                    },
                    _ => out.push(self.replace(arg)),
                },
                other => out.push(self.replace(other)),
            }
        }
        out
    }
}

/// Take one argument for a plain parameter from the front or the back.
///
/// An open-ended `*tuple[X, ...]` feeds `X` to the plain parameter and
/// stays in place for the variadic one.
fn take(
    rest: &mut VecDeque<NormType>,
    front: bool,
    origin: &str,
) -> Option<Result<NormType, NormalizeError>> {
    let arg = if front { rest.pop_front()? } else { rest.pop_back()? };
    let NormType::Unpacked(inner) = &arg else {
        return Some(Ok(arg));
    };
    let item = match inner.as_ref() {
        NormType::Apply { origin: Origin::Tuple, args } if args.len() == 2 && args[1] == NormType::Ellipsis => {
            args[0].clone()
        }
        _ => {
            return Some(Err(NormalizeError::InvalidType {
                ty: origin.to_string(),
                reason: format!("cannot bind a plain parameter from {arg}"),
            }))
        }
    };
    if front {
        rest.push_front(arg);
    } else {
        rest.push_back(arg);
    }
    Some(Ok(item))
}
