//! Model serialization: field reads, sieves, extra merge

use std::collections::HashMap;

use bindery_value::Value;

use crate::name_layout::{OutCrown, OutExtraMove, OutputNameLayout};
use crate::pipeline::{SerializeError, Serializer};
use crate::shape::OutputField;

pub(super) struct OutputPlan {
    pub field: OutputField,
    pub serializer: Serializer,
}

pub(super) struct ModelSerializer {
    name: String,
    plans: Vec<OutputPlan>,
    positions: HashMap<String, usize>,
    crown: OutCrown,
    extra_targets: Vec<String>,
    debug_path: bool,
}

impl ModelSerializer {
    pub fn new(name: String, plans: Vec<OutputPlan>, layout: &OutputNameLayout, debug_path: bool) -> Self {
        let positions = plans.iter().enumerate().map(|(i, p)| (p.field.id.clone(), i)).collect();
        let extra_targets = match &layout.extra_move {
            Some(OutExtraMove::Targets(ids)) => ids.clone(),
            None => Vec::new(),
        };
        Self { name, plans, positions, crown: layout.crown.clone(), extra_targets, debug_path }
    }

    pub fn serialize(&self, data: &Value) -> Result<Value, SerializeError> {
        if let Value::Record { type_name, .. } = data {
            if *type_name != self.name {
                return Err(SerializeError::mismatch(self.name.as_str(), data));
            }
        }
        let mut out = self.emit(&self.crown, data)?;

        if let Value::Dict(entries) = &mut out {
            for id in &self.extra_targets {
                match self.field(id, data).map_err(|e| e.at_if(self.debug_path, id.as_str()))? {
                    Value::Dict(extra) => entries.extend(extra),
                    Value::None => {}
                    other => {
                        return Err(SerializeError::mismatch("dict", &other).at_if(self.debug_path, id.as_str()))
                    }
                }
            }
        }
        Ok(out)
    }

    /// Read and serialize one field.
    fn field(&self, id: &str, data: &Value) -> Result<Value, SerializeError> {
        let plan = self
            .positions
            .get(id)
            .map(|&i| &self.plans[i])
            .ok_or_else(|| SerializeError::MissingField { field: id.to_string() })?;
        let raw = plan
            .field
            .accessor
            .read(data)
            .ok_or_else(|| SerializeError::MissingField { field: id.to_string() })?;
        (plan.serializer)(raw)
    }

    fn emit(&self, crown: &OutCrown, data: &Value) -> Result<Value, SerializeError> {
        match crown {
            OutCrown::Dict(d) => {
                let mut entries = Vec::with_capacity(d.map.len());
                for (key, sub) in &d.map {
                    if let OutCrown::Field(id) = sub {
                        let plan = self.positions.get(id).map(|&i| &self.plans[i]);
                        let raw = plan.and_then(|p| p.field.accessor.read(data));
                        if raw.is_none() && plan.is_some_and(|p| !p.field.is_required) {
                            continue;
                        }
                        if let (Some(raw), Some(sieve)) = (raw, d.sieves.get(key)) {
                            if !sieve.keep(raw) {
                                continue;
                            }
                        }
                    }
                    let value = self.emit(sub, data).map_err(|e| e.at_if(self.debug_path, key.as_str()))?;
                    entries.push((Value::Str(key.clone()), value));
                }
                Ok(Value::Dict(entries))
            }
            OutCrown::List(l) => {
                let mut items = Vec::with_capacity(l.items.len());
                for (i, sub) in l.items.iter().enumerate() {
                    items.push(self.emit(sub, data).map_err(|e| e.at_if(self.debug_path, i))?);
                }
                Ok(Value::List(items))
            }
            OutCrown::Field(id) => self.field(id, data),
            OutCrown::None(placeholder) => Ok(placeholder.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name_layout::{OutDictCrown, OutListCrown, Sieve};
    use crate::pipeline::serializer;
    use crate::shape::Accessor;
    use crate::types::NormType;
    use indexmap::IndexMap;

    fn identity() -> Serializer {
        serializer(|v| Ok(v.clone()))
    }

    fn plans(ids: &[&str]) -> Vec<OutputPlan> {
        ids.iter()
            .map(|id| OutputPlan { field: OutputField::new(*id, NormType::Any), serializer: identity() })
            .collect()
    }

    fn point() -> Value {
        Value::record("Point", [("x", Value::Int(1)), ("y", Value::Int(0))])
    }

    #[test]
    fn test_sieve_omits_default() {
        let mut map = IndexMap::new();
        map.insert("x".to_string(), OutCrown::Field("x".into()));
        map.insert("y".to_string(), OutCrown::Field("y".into()));
        let mut sieves = HashMap::new();
        sieves.insert("y".to_string(), Sieve::new(|v| *v != Value::Int(0)));
        let layout = OutputNameLayout { crown: OutCrown::Dict(OutDictCrown { map, sieves }), extra_move: None };

        let model = ModelSerializer::new("Point".into(), plans(&["x", "y"]), &layout, true);
        assert_eq!(model.serialize(&point()), Ok(Value::dict([("x", Value::Int(1))])));
    }

    #[test]
    fn test_list_crown_with_placeholder() {
        let layout = OutputNameLayout {
            crown: OutCrown::List(OutListCrown {
                items: vec![OutCrown::Field("x".into()), OutCrown::None(Value::None), OutCrown::Field("y".into())],
            }),
            extra_move: None,
        };
        let model = ModelSerializer::new("Point".into(), plans(&["x", "y"]), &layout, true);
        assert_eq!(
            model.serialize(&point()),
            Ok(Value::List(vec![Value::Int(1), Value::None, Value::Int(0)]))
        );
    }

    #[test]
    fn test_absent_optional_item_is_left_out() {
        let mut map = IndexMap::new();
        map.insert("title".to_string(), OutCrown::Field("title".into()));
        map.insert("year".to_string(), OutCrown::Field("year".into()));
        let layout =
            OutputNameLayout { crown: OutCrown::Dict(OutDictCrown { map, sieves: HashMap::new() }), extra_move: None };
        let plans = vec![
            OutputPlan {
                field: OutputField::new("title", NormType::Any).with_accessor(Accessor::Item("title".into())),
                serializer: identity(),
            },
            OutputPlan {
                field: OutputField::new("year", NormType::Any).with_accessor(Accessor::Item("year".into())).optional(),
                serializer: identity(),
            },
        ];
        let model = ModelSerializer::new("Movie".into(), plans, &layout, true);
        let movie = Value::dict([("title", Value::str("Heat"))]);
        assert_eq!(model.serialize(&movie), Ok(Value::dict([("title", Value::str("Heat"))])));
    }

    #[test]
    fn test_other_records_are_rejected() {
        let layout = OutputNameLayout { crown: OutCrown::Field("x".into()), extra_move: None };
        let model = ModelSerializer::new("Point".into(), plans(&["x"]), &layout, true);
        assert!(model.serialize(&Value::record("Line", [("x", Value::Int(1))])).is_err());
    }
}
