//! Bridge between [`Value`] and `serde_json::Value`.

use serde_json::{Map, Number};

use crate::{ConversionError, Value};

impl Value {
    /// Decode JSON into the untyped subset of `Value`.
    ///
    /// Integers that fit an `i64` become `Int`, every other number `Float`.
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::None,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Dict(
                map.into_iter()
                    .map(|(k, v)| (Value::Str(k), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Encode as JSON. Sequences become arrays, records become objects and
    /// enum members their member name.
    pub fn to_json(&self) -> Result<serde_json::Value, ConversionError> {
        Ok(match self {
            Value::None => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(n) => serde_json::Value::Number((*n).into()),
            Value::Float(x) => Number::from_f64(*x)
                .map(serde_json::Value::Number)
                .ok_or(ConversionError::NonFiniteFloat(*x))?,
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::List(items)
            | Value::Tuple(items)
            | Value::Set(items)
            | Value::FrozenSet(items)
            | Value::Deque(items) => serde_json::Value::Array(
                items.iter().map(Value::to_json).collect::<Result<_, _>>()?,
            ),
            Value::Dict(entries) => {
                let mut map = Map::new();
                for (k, v) in entries {
                    let key = match k {
                        Value::Str(s) => s.clone(),
                        other => return Err(ConversionError::NonStringKey(other.kind())),
                    };
                    map.insert(key, v.to_json()?);
                }
                serde_json::Value::Object(map)
            }
            Value::Record { fields, .. } => {
                let mut map = Map::new();
                for (k, v) in fields {
                    map.insert(k.clone(), v.to_json()?);
                }
                serde_json::Value::Object(map)
            }
            Value::Enum { member, .. } => serde_json::Value::String(member.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_keeps_key_order_and_number_kinds() {
        let v = Value::from_json(json!({"a": 1, "b": 1.5, "c": [null, true]}));
        assert_eq!(
            v,
            Value::dict([
                ("a", Value::Int(1)),
                ("b", Value::Float(1.5)),
                ("c", Value::List(vec![Value::None, Value::Bool(true)])),
            ])
        );
    }

    #[test]
    fn test_to_json_rejects_non_string_keys() {
        let v = Value::Dict(vec![(Value::Int(1), Value::None)]);
        assert_eq!(
            v.to_json(),
            Err(ConversionError::NonStringKey(crate::ValueType::Int))
        );
    }

    #[test]
    fn test_to_json_flattens_typed_values() {
        let v = Value::Tuple(vec![
            Value::Set(vec![Value::Int(1)]),
            Value::Enum { type_name: "Color".into(), member: "RED".into() },
        ]);
        assert_eq!(v.to_json().expect("json"), json!([[1], "RED"]));
    }
}
