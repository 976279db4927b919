//! Containers: homogeneous iterables, tuples and dicts

use bindery_value::Value;

use crate::mediator::Mediator;
use crate::pipeline::{parser, serializer, ParseError, Parser, PathElement, SerializeError, Serializer};
use crate::provider::{CannotProvide, Loc, ParserRequest, ProvideResult, SerializerRequest, StaticProvider};
use crate::types::{NormType, Origin};

/// Items of any sequence input; strings and mappings are not sequences.
fn items_of(data: &Value) -> Result<&[Value], ParseError> {
    data.as_items().ok_or_else(|| ParseError::mismatch("iterable", data))
}

fn rebuild(origin: &Origin, mut items: Vec<Value>) -> Value {
    match origin {
        Origin::Set | Origin::FrozenSet => {
            let mut unique: Vec<Value> = Vec::with_capacity(items.len());
            for item in items.drain(..) {
                if !unique.contains(&item) {
                    unique.push(item);
                }
            }
            if *origin == Origin::Set {
                Value::Set(unique)
            } else {
                Value::FrozenSet(unique)
            }
        }
        Origin::Deque => Value::Deque(items),
        Origin::Tuple => Value::Tuple(items),
        _ => Value::List(items),
    }
}

// ============================================================================
// list, set, frozenset, deque
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct IterableProvider;

fn element_of(ty: &NormType) -> Result<(Origin, NormType), CannotProvide> {
    match ty {
        NormType::Apply { origin, args } if origin.is_iterable() => {
            let element = args.first().cloned().unwrap_or(NormType::Any);
            Ok((origin.clone(), element))
        }
        _ => Err(CannotProvide::unsupported()),
    }
}

impl StaticProvider for IterableProvider {
    fn provide_parser(&self, mediator: &mut Mediator<'_>, request: &ParserRequest) -> ProvideResult<Parser> {
        let (origin, element) = element_of(&request.loc.ty)?;
        let item_parser = mediator.provide(request.nested(Loc::of(element)))?;
        let debug_path = request.debug_path;
        Ok(parser(move |data| {
            let items = items_of(data)?;
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                out.push(item_parser(item).map_err(|e| e.at_if(debug_path, i))?);
            }
            Ok(rebuild(&origin, out))
        }))
    }

    fn provide_serializer(
        &self,
        mediator: &mut Mediator<'_>,
        request: &SerializerRequest,
    ) -> ProvideResult<Serializer> {
        let (_, element) = element_of(&request.loc.ty)?;
        let item_serializer = mediator.provide(request.nested(Loc::of(element)))?;
        let debug_path = request.debug_path;
        Ok(serializer(move |data| {
            let items = data.as_items().ok_or_else(|| SerializeError::mismatch("iterable", data))?;
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                out.push(item_serializer(item).map_err(|e| e.at_if(debug_path, i))?);
            }
            Ok(Value::List(out))
        }))
    }
}

// ============================================================================
// tuple
// ============================================================================

/// Argument list of a tuple: fixed items around an optional run of
/// any length.
#[derive(Debug, Clone, PartialEq)]
struct TupleForm {
    prefix: Vec<NormType>,
    run: Option<NormType>,
    suffix: Vec<NormType>,
}

fn tuple_form(ty: &NormType) -> Result<TupleForm, CannotProvide> {
    let NormType::Apply { origin: Origin::Tuple, args } = ty else {
        return Err(CannotProvide::unsupported());
    };
    // tuple[X, ...]
    if let [item, NormType::Ellipsis] = args.as_slice() {
        return Ok(TupleForm { prefix: Vec::new(), run: Some(item.clone()), suffix: Vec::new() });
    }
    let mut form = TupleForm { prefix: Vec::new(), run: None, suffix: Vec::new() };
    for arg in args {
        match arg {
            NormType::Unpacked(inner) if form.run.is_none() => {
                let item = match inner.as_ref() {
                    NormType::Apply { origin: Origin::Tuple, args } => match args.as_slice() {
                        [item, NormType::Ellipsis] => item.clone(),
                        _ => NormType::Any,
                    },
                    _ => NormType::Any,
                };
                form.run = Some(item);
            }
            NormType::Unpacked(_) | NormType::Ellipsis => {
                return Err(CannotProvide::new(format!("unsupported tuple form {ty}")))
            }
            fixed if form.run.is_none() => form.prefix.push(fixed.clone()),
            fixed => form.suffix.push(fixed.clone()),
        }
    }
    Ok(form)
}

impl TupleForm {
    fn fixed(&self) -> usize {
        self.prefix.len() + self.suffix.len()
    }

    /// The expected item count when `len` items do not fit.
    fn len_mismatch(&self, len: usize) -> Option<String> {
        match &self.run {
            None if len != self.fixed() => Some(self.fixed().to_string()),
            Some(_) if len < self.fixed() => Some(format!("at least {}", self.fixed())),
            _ => None,
        }
    }

    fn check_len(&self, len: usize) -> Result<(), ParseError> {
        match self.len_mismatch(len) {
            Some(expected) => Err(ParseError::ItemCount { expected, got: len }),
            None => Ok(()),
        }
    }
}

/// Routines for the prefix, the run and the suffix of a tuple.
struct TupleRoutines<F> {
    prefix: Vec<F>,
    run: Option<F>,
    suffix: Vec<F>,
}

impl<F> TupleRoutines<F> {
    fn build(form: &TupleForm, mut make: impl FnMut(&NormType) -> ProvideResult<F>) -> ProvideResult<Self> {
        let prefix = form.prefix.iter().map(&mut make).collect::<ProvideResult<Vec<_>>>()?;
        let run = form.run.as_ref().map(&mut make).transpose()?;
        let suffix = form.suffix.iter().map(&mut make).collect::<ProvideResult<Vec<_>>>()?;
        Ok(Self { prefix, run, suffix })
    }

    fn for_position(&self, index: usize, len: usize) -> Option<&F> {
        let suffix_start = len - self.suffix.len();
        if index < self.prefix.len() {
            self.prefix.get(index)
        } else if index >= suffix_start {
            self.suffix.get(index - suffix_start)
        } else {
            self.run.as_ref()
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TupleProvider;

impl StaticProvider for TupleProvider {
    fn provide_parser(&self, mediator: &mut Mediator<'_>, request: &ParserRequest) -> ProvideResult<Parser> {
        let form = tuple_form(&request.loc.ty)?;
        let routines = TupleRoutines::build(&form, |ty| mediator.provide(request.nested(Loc::of(ty.clone()))))?;
        let debug_path = request.debug_path;
        Ok(parser(move |data| {
            let items = items_of(data)?;
            form.check_len(items.len())?;
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let value = match routines.for_position(i, items.len()) {
                    Some(p) => p(item).map_err(|e| e.at_if(debug_path, i))?,
                    None => item.clone(),
                };
                out.push(value);
            }
            Ok(Value::Tuple(out))
        }))
    }

    fn provide_serializer(
        &self,
        mediator: &mut Mediator<'_>,
        request: &SerializerRequest,
    ) -> ProvideResult<Serializer> {
        let form = tuple_form(&request.loc.ty)?;
        let routines = TupleRoutines::build(&form, |ty| mediator.provide(request.nested(Loc::of(ty.clone()))))?;
        let debug_path = request.debug_path;
        Ok(serializer(move |data| {
            let items = data.as_items().ok_or_else(|| SerializeError::mismatch("tuple", data))?;
            if let Some(expected) = form.len_mismatch(items.len()) {
                return Err(SerializeError::InvalidValue {
                    message: format!("expected {expected} items, got {}", items.len()),
                });
            }
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let value = match routines.for_position(i, items.len()) {
                    Some(s) => s(item).map_err(|e| e.at_if(debug_path, i))?,
                    None => item.clone(),
                };
                out.push(value);
            }
            Ok(Value::List(out))
        }))
    }
}

// ============================================================================
// dict
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct DictProvider;

fn dict_args(ty: &NormType) -> Result<(NormType, NormType), CannotProvide> {
    match ty {
        NormType::Apply { origin: Origin::Dict, args } => match args.as_slice() {
            [key, value] => Ok((key.clone(), value.clone())),
            _ => Ok((NormType::Any, NormType::Any)),
        },
        _ => Err(CannotProvide::unsupported()),
    }
}

fn key_segment(key: &Value) -> PathElement {
    match key {
        Value::Str(s) => PathElement::Key(s.clone()),
        other => PathElement::Key(other.to_string()),
    }
}

impl StaticProvider for DictProvider {
    fn provide_parser(&self, mediator: &mut Mediator<'_>, request: &ParserRequest) -> ProvideResult<Parser> {
        let (key_ty, value_ty) = dict_args(&request.loc.ty)?;
        let key_parser = mediator.provide(request.nested(Loc::of(key_ty)))?;
        let value_parser = mediator.provide(request.nested(Loc::of(value_ty)))?;
        let debug_path = request.debug_path;
        Ok(parser(move |data| {
            let Value::Dict(entries) = data else {
                return Err(ParseError::mismatch("dict", data));
            };
            let mut out = Vec::with_capacity(entries.len());
            for (k, v) in entries {
                let key = key_parser(k).map_err(|e| e.at_if(debug_path, key_segment(k)))?;
                let value = value_parser(v).map_err(|e| e.at_if(debug_path, key_segment(k)))?;
                out.push((key, value));
            }
            Ok(Value::Dict(out))
        }))
    }

    fn provide_serializer(
        &self,
        mediator: &mut Mediator<'_>,
        request: &SerializerRequest,
    ) -> ProvideResult<Serializer> {
        let (key_ty, value_ty) = dict_args(&request.loc.ty)?;
        let key_serializer = mediator.provide(request.nested(Loc::of(key_ty)))?;
        let value_serializer = mediator.provide(request.nested(Loc::of(value_ty)))?;
        let debug_path = request.debug_path;
        Ok(serializer(move |data| {
            let Value::Dict(entries) = data else {
                return Err(SerializeError::mismatch("dict", data));
            };
            let mut out = Vec::with_capacity(entries.len());
            for (k, v) in entries {
                let key = key_serializer(k).map_err(|e| e.at_if(debug_path, key_segment(k)))?;
                let value = value_serializer(v).map_err(|e| e.at_if(debug_path, key_segment(k)))?;
                out.push((key, value));
            }
            Ok(Value::Dict(out))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concrete::ScalarProvider;
    use crate::pipeline::Path;
    use crate::provider::Provider;
    use crate::types::{normalize, TypeHint};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn recipe() -> Vec<Arc<dyn Provider>> {
        vec![
            Arc::new(IterableProvider),
            Arc::new(TupleProvider),
            Arc::new(DictProvider),
            Arc::new(ScalarProvider),
        ]
    }

    fn parse(hint: TypeHint, data: Value) -> Result<Value, ParseError> {
        let recipe = recipe();
        let mut mediator = Mediator::new(&recipe);
        let p = mediator
            .provide(ParserRequest::new(Loc::of(normalize(&hint).expect("normalize"))))
            .expect("provide");
        p(&data)
    }

    fn dump(hint: TypeHint, data: Value) -> Result<Value, SerializeError> {
        let recipe = recipe();
        let mut mediator = Mediator::new(&recipe);
        let s = mediator
            .provide(SerializerRequest::new(Loc::of(normalize(&hint).expect("normalize"))))
            .expect("provide");
        s(&data)
    }

    #[test]
    fn test_set_keeps_first_occurrence() {
        let data = Value::List(vec![Value::Int(2), Value::Int(1), Value::Int(2)]);
        assert_eq!(
            parse(TypeHint::set(TypeHint::int()), data),
            Ok(Value::Set(vec![Value::Int(2), Value::Int(1)]))
        );
    }

    #[test]
    fn test_item_errors_carry_index() {
        let data = Value::List(vec![Value::Int(1), Value::str("x")]);
        let err = parse(TypeHint::list(TypeHint::int()), data).expect_err("mismatch");
        assert_eq!(err.path(), Some(&Path::new([1usize])));
    }

    #[test]
    fn test_fixed_tuple_checks_length() {
        let hint = TypeHint::tuple(vec![TypeHint::int(), TypeHint::str()]);
        let ok = Value::List(vec![Value::Int(1), Value::str("a")]);
        assert_eq!(parse(hint.clone(), ok), Ok(Value::Tuple(vec![Value::Int(1), Value::str("a")])));
        assert_eq!(
            parse(hint, Value::List(vec![Value::Int(1)])),
            Err(ParseError::ItemCount { expected: "2".into(), got: 1 })
        );
    }

    #[test]
    fn test_fixed_tuple_serializer_rejects_extra_items() {
        let hint = TypeHint::tuple(vec![TypeHint::int(), TypeHint::int()]);
        assert_eq!(
            dump(hint.clone(), Value::Tuple(vec![Value::Int(1), Value::Int(2)])),
            Ok(Value::List(vec![Value::Int(1), Value::Int(2)]))
        );
        let long = Value::Tuple(vec![Value::Int(1), Value::Int(2), Value::str("junk")]);
        assert!(matches!(dump(hint.clone(), long), Err(SerializeError::InvalidValue { .. })));
        assert!(dump(hint, Value::Tuple(vec![Value::Int(1)])).is_err());
    }

    #[test]
    fn test_variadic_middle() {
        // tuple[int, *tuple[str, ...], bool]
        let hint = TypeHint::tuple(vec![
            TypeHint::int(),
            TypeHint::unpack(TypeHint::tuple_of(TypeHint::str())),
            TypeHint::bool(),
        ]);
        let data = Value::List(vec![Value::Int(1), Value::str("a"), Value::str("b"), Value::Bool(true)]);
        assert!(parse(hint.clone(), data).is_ok());
        let bad = Value::List(vec![Value::Int(1), Value::Int(2), Value::Bool(true)]);
        assert_eq!(parse(hint.clone(), bad).expect_err("mismatch").path(), Some(&Path::new([1usize])));
        assert!(matches!(
            parse(hint, Value::List(vec![Value::Int(1)])),
            Err(ParseError::ItemCount { .. })
        ));
    }

    #[test]
    fn test_dict_value_errors_carry_key() {
        let hint = TypeHint::dict(TypeHint::str(), TypeHint::int());
        let data = Value::dict([("a", Value::Int(1)), ("b", Value::Bool(false))]);
        let err = parse(hint, data).expect_err("mismatch");
        assert_eq!(err.path(), Some(&Path::new(["b"])));
    }
}
