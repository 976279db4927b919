//! Scalars and `Any`

use bindery_value::Value;

use crate::mediator::Mediator;
use crate::pipeline::{parser, serializer, ParseError, Parser, SerializeError, Serializer};
use crate::provider::{CannotProvide, ParserRequest, ProvideResult, SerializerRequest, StaticProvider};
use crate::types::{NormType, Origin};

/// `None`, `bool`, `int`, `float`, `str` and `Any`.
///
/// With strict coercion a value must already have the target kind; an
/// `int` is still accepted where a `float` is expected. Without it, numbers
/// and booleans are converted between each other and from strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scalar {
    None,
    Bool,
    Int,
    Float,
    Str,
    Any,
}

fn scalar_of(ty: &NormType) -> Result<Scalar, CannotProvide> {
    match ty {
        NormType::Any => Ok(Scalar::Any),
        NormType::Apply { origin, args } if args.is_empty() => match origin {
            Origin::NoneType => Ok(Scalar::None),
            Origin::Bool => Ok(Scalar::Bool),
            Origin::Int => Ok(Scalar::Int),
            Origin::Float => Ok(Scalar::Float),
            Origin::Str => Ok(Scalar::Str),
            _ => Err(CannotProvide::unsupported()),
        },
        _ => Err(CannotProvide::unsupported()),
    }
}

fn parse_strict(scalar: Scalar, data: &Value) -> Result<Value, ParseError> {
    match (scalar, data) {
        (Scalar::Any, v) => Ok(v.clone()),
        (Scalar::None, Value::None) => Ok(Value::None),
        (Scalar::Bool, Value::Bool(b)) => Ok(Value::Bool(*b)),
        (Scalar::Int, Value::Int(n)) => Ok(Value::Int(*n)),
        (Scalar::Float, Value::Float(x)) => Ok(Value::Float(*x)),
        (Scalar::Float, Value::Int(n)) => Ok(Value::Float(*n as f64)),
        (Scalar::Str, Value::Str(s)) => Ok(Value::Str(s.clone())),
        (scalar, other) => Err(ParseError::mismatch(scalar.name(), other)),
    }
}

fn parse_lenient(scalar: Scalar, data: &Value) -> Result<Value, ParseError> {
    if let Ok(value) = parse_strict(scalar, data) {
        return Ok(value);
    }
    match (scalar, data) {
        (Scalar::Bool, Value::Int(0)) => Ok(Value::Bool(false)),
        (Scalar::Bool, Value::Int(1)) => Ok(Value::Bool(true)),
        (Scalar::Bool, Value::Str(s)) => match s.to_ascii_lowercase().as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(ParseError::invalid(format!("{s:?} is not a boolean"))),
        },
        (Scalar::Int, Value::Bool(b)) => Ok(Value::Int(i64::from(*b))),
        (Scalar::Int, Value::Float(x)) if x.fract() == 0.0 && x.is_finite() => {
            // i64::MAX is not representable; 2^63 is the first float past it
            if *x >= i64::MIN as f64 && *x < 9_223_372_036_854_775_808.0 {
                Ok(Value::Int(*x as i64))
            } else {
                Err(ParseError::invalid(format!("{x} is out of range for int")))
            }
        }
        (Scalar::Int, Value::Str(s)) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| ParseError::invalid(format!("{s:?} is not an integer: {e}"))),
        (Scalar::Float, Value::Bool(b)) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
        (Scalar::Float, Value::Str(s)) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|e| ParseError::invalid(format!("{s:?} is not a number: {e}"))),
        (Scalar::Str, Value::Bool(_) | Value::Int(_) | Value::Float(_)) => Ok(Value::Str(data.to_string())),
        (scalar, other) => Err(ParseError::mismatch(scalar.name(), other)),
    }
}

fn serialize(scalar: Scalar, data: &Value) -> Result<Value, SerializeError> {
    match (scalar, data) {
        (Scalar::Any, v) => Ok(v.clone()),
        (Scalar::None, Value::None)
        | (Scalar::Bool, Value::Bool(_))
        | (Scalar::Int, Value::Int(_))
        | (Scalar::Float, Value::Float(_))
        | (Scalar::Str, Value::Str(_)) => Ok(data.clone()),
        (Scalar::Float, Value::Int(n)) => Ok(Value::Float(*n as f64)),
        (scalar, other) => Err(SerializeError::mismatch(scalar.name(), other)),
    }
}

impl Scalar {
    fn name(self) -> &'static str {
        match self {
            Scalar::None => "None",
            Scalar::Bool => "bool",
            Scalar::Int => "int",
            Scalar::Float => "float",
            Scalar::Str => "str",
            Scalar::Any => "Any",
        }
    }
}

impl StaticProvider for ScalarProvider {
    fn provide_parser(&self, _: &mut Mediator<'_>, request: &ParserRequest) -> ProvideResult<Parser> {
        let scalar = scalar_of(&request.loc.ty)?;
        Ok(if request.strict_coercion {
            parser(move |data| parse_strict(scalar, data))
        } else {
            parser(move |data| parse_lenient(scalar, data))
        })
    }

    fn provide_serializer(&self, _: &mut Mediator<'_>, request: &SerializerRequest) -> ProvideResult<Serializer> {
        let scalar = scalar_of(&request.loc.ty)?;
        Ok(serializer(move |data| serialize(scalar, data)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_value::ValueType;

    #[test]
    fn test_strict_rejects_other_kinds() {
        assert_eq!(parse_strict(Scalar::Int, &Value::Int(3)), Ok(Value::Int(3)));
        assert_eq!(
            parse_strict(Scalar::Int, &Value::Bool(true)),
            Err(ParseError::TypeMismatch { expected: "int".into(), got: ValueType::Bool })
        );
        assert!(parse_strict(Scalar::Str, &Value::Int(1)).is_err());
        assert_eq!(parse_strict(Scalar::Float, &Value::Int(2)), Ok(Value::Float(2.0)));
    }

    #[test]
    fn test_lenient_coerces() {
        assert_eq!(parse_lenient(Scalar::Int, &Value::str(" 42 ")), Ok(Value::Int(42)));
        assert_eq!(parse_lenient(Scalar::Int, &Value::Float(3.0)), Ok(Value::Int(3)));
        assert!(parse_lenient(Scalar::Int, &Value::Float(3.5)).is_err());
        assert!(parse_lenient(Scalar::Int, &Value::Float(1e20)).is_err());
        assert!(parse_lenient(Scalar::Int, &Value::Float(-1e20)).is_err());
        assert_eq!(
            parse_lenient(Scalar::Int, &Value::Float(-9_007_199_254_740_992.0)),
            Ok(Value::Int(-9_007_199_254_740_992))
        );
        assert_eq!(parse_lenient(Scalar::Bool, &Value::str("TRUE")), Ok(Value::Bool(true)));
        assert_eq!(parse_lenient(Scalar::Str, &Value::Int(7)), Ok(Value::str("7")));
    }

    #[test]
    fn test_containers_are_not_scalars() {
        let list = NormType::apply(Origin::List, vec![NormType::Any]);
        assert!(scalar_of(&list).is_err());
        assert_eq!(scalar_of(&NormType::Any).ok(), Some(Scalar::Any));
    }
}
