//! `Literal` and `Union`

use bindery_value::Value;

use crate::mediator::Mediator;
use crate::pipeline::{parser, serializer, ParseError, Parser, SerializeError, Serializer};
use crate::provider::{CannotProvide, Loc, ParserRequest, ProvideResult, SerializerRequest, StaticProvider};
use crate::types::NormType;

#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralProvider;

impl StaticProvider for LiteralProvider {
    fn provide_parser(&self, _: &mut Mediator<'_>, request: &ParserRequest) -> ProvideResult<Parser> {
        let NormType::Literal(allowed) = &request.loc.ty else {
            return Err(CannotProvide::unsupported().into());
        };
        let allowed = allowed.clone();
        Ok(parser(move |data| {
            if allowed.iter().any(|v| v.matches(data)) {
                Ok(data.clone())
            } else {
                Err(ParseError::NotLiteral { value: data.clone(), allowed: allowed.clone() })
            }
        }))
    }

    fn provide_serializer(&self, _: &mut Mediator<'_>, request: &SerializerRequest) -> ProvideResult<Serializer> {
        let NormType::Literal(allowed) = &request.loc.ty else {
            return Err(CannotProvide::unsupported().into());
        };
        let allowed = allowed.clone();
        Ok(serializer(move |data| {
            if allowed.iter().any(|v| v.matches(data)) {
                Ok(data.clone())
            } else {
                Err(SerializeError::InvalidValue { message: format!("{data} is not an allowed literal") })
            }
        }))
    }
}

/// Tries the members of a union in declared order; the first one that
/// accepts the value wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnionProvider;

impl StaticProvider for UnionProvider {
    fn provide_parser(&self, mediator: &mut Mediator<'_>, request: &ParserRequest) -> ProvideResult<Parser> {
        let NormType::Union(members) = &request.loc.ty else {
            return Err(CannotProvide::unsupported().into());
        };
        let mut parsers = Vec::with_capacity(members.len());
        for member in members {
            parsers.push(mediator.provide(request.nested(Loc::of(member.clone())))?);
        }
        Ok(parser(move |data| first_success(&parsers, data, |errors| ParseError::Union { errors })))
    }

    fn provide_serializer(
        &self,
        mediator: &mut Mediator<'_>,
        request: &SerializerRequest,
    ) -> ProvideResult<Serializer> {
        let NormType::Union(members) = &request.loc.ty else {
            return Err(CannotProvide::unsupported().into());
        };
        let mut serializers = Vec::with_capacity(members.len());
        for member in members {
            serializers.push(mediator.provide(request.nested(Loc::of(member.clone())))?);
        }
        Ok(serializer(move |data| {
            first_success(&serializers, data, |errors| SerializeError::Union { errors })
        }))
    }
}

fn first_success<E>(
    routines: &[std::sync::Arc<dyn Fn(&Value) -> Result<Value, E> + Send + Sync>],
    data: &Value,
    combine: impl FnOnce(Vec<E>) -> E,
) -> Result<Value, E> {
    let mut errors = Vec::with_capacity(routines.len());
    for routine in routines {
        match routine(data) {
            Ok(value) => return Ok(value),
            Err(e) => errors.push(e),
        }
    }
    Err(combine(errors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concrete::ScalarProvider;
    use crate::provider::Provider;
    use crate::types::{normalize, TypeHint};
    use std::sync::Arc;

    fn recipe() -> Vec<Arc<dyn Provider>> {
        vec![Arc::new(LiteralProvider), Arc::new(UnionProvider), Arc::new(ScalarProvider)]
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
    fn test_literal_requires_exact_kind() {
        let hint = TypeHint::literal([1i64, 2]);
        assert_eq!(parse(hint.clone(), Value::Int(1)), Ok(Value::Int(1)));
        assert!(matches!(parse(hint, Value::Bool(true)), Err(ParseError::NotLiteral { .. })));
    }

    #[test]
    fn test_union_first_match_wins() {
        let hint = TypeHint::union(vec![TypeHint::int(), TypeHint::str()]);
        assert_eq!(parse(hint.clone(), Value::str("a")), Ok(Value::str("a")));
        match parse(hint, Value::Float(1.5)) {
            Err(ParseError::Union { errors }) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_union_serializer_follows_member_order() {
        // float accepts ints, so it widens them when listed first
        let float_first = TypeHint::union(vec![TypeHint::float(), TypeHint::int()]);
        assert_eq!(dump(float_first, Value::Int(3)), Ok(Value::Float(3.0)));

        let int_first = TypeHint::union(vec![TypeHint::int(), TypeHint::float()]);
        assert_eq!(dump(int_first.clone(), Value::Int(3)), Ok(Value::Int(3)));
        assert_eq!(dump(int_first, Value::Float(2.5)), Ok(Value::Float(2.5)));
    }

    #[test]
    fn test_optional() {
        let hint = TypeHint::optional(TypeHint::int());
        assert_eq!(parse(hint.clone(), Value::None), Ok(Value::None));
        assert_eq!(parse(hint, Value::Int(4)), Ok(Value::Int(4)));
    }
}
