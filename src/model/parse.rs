//! Model parsing: crown walk, defaults, constructor call

use std::collections::HashMap;

use bindery_value::Value;
use indexmap::IndexMap;

use crate::name_layout::{DictExtraPolicy, InpCrown, InpExtraMove, InputNameLayout, ListExtraPolicy};
use crate::pipeline::{ParseError, Parser};
use crate::shape::{Constructor, ConstructorArgs, InputField, ParamKind};

pub(super) struct InputPlan {
    pub field: InputField,
    /// Absent for fields the layout skips
    pub parser: Option<Parser>,
}

pub(super) struct ModelParser {
    plans: Vec<InputPlan>,
    positions: HashMap<String, usize>,
    crown: InpCrown,
    extra_move: Option<InpExtraMove>,
    constructor: Constructor,
    debug_path: bool,
}

/// Values found while walking one input.
struct Found {
    values: Vec<Option<Value>>,
    extra: IndexMap<String, Value>,
}

fn key_string(key: &Value) -> String {
    match key {
        Value::Str(s) => s.clone(),
        other => other.to_string(),
    }
}

impl ModelParser {
    pub fn new(plans: Vec<InputPlan>, layout: &InputNameLayout, constructor: Constructor, debug_path: bool) -> Self {
        let positions = plans.iter().enumerate().map(|(i, p)| (p.field.id.clone(), i)).collect();
        Self {
            plans,
            positions,
            crown: layout.crown.clone(),
            extra_move: layout.extra_move.clone(),
            constructor,
            debug_path,
        }
    }

    pub fn parse(&self, data: &Value) -> Result<Value, ParseError> {
        let mut found = Found { values: vec![None; self.plans.len()], extra: IndexMap::new() };
        self.walk(&self.crown, data, &mut found)?;

        if let Some(InpExtraMove::Targets(ids)) = &self.extra_move {
            let collected = Value::dict(found.extra.clone());
            for id in ids {
                let Some(&index) = self.positions.get(id) else { continue };
                let value = match &self.plans[index].parser {
                    Some(parser) => parser(&collected).map_err(|e| e.at_if(self.debug_path, id.as_str()))?,
                    None => collected.clone(),
                };
                found.values[index] = Some(value);
            }
        }

        let mut args = ConstructorArgs::default();
        for (plan, value) in self.plans.iter().zip(found.values) {
            let field = &plan.field;
            let value = match value.or_else(|| field.default.produce()) {
                Some(value) => value,
                None if field.is_required => return Err(ParseError::MissingField { field: field.id.clone() }),
                None => match field.param_kind {
                    ParamKind::Positional => Value::None,
                    ParamKind::Keyword => continue,
                },
            };
            match field.param_kind {
                ParamKind::Positional => args.positional.push(value),
                ParamKind::Keyword => {
                    args.keyword.insert(field.param_name.clone(), value);
                }
            }
        }
        if let Some(InpExtraMove::Kwargs) = self.extra_move {
            args.extra_kwargs = found.extra;
        }
        self.constructor.call(args)
    }

    fn walk(&self, crown: &InpCrown, data: &Value, found: &mut Found) -> Result<(), ParseError> {
        match crown {
            InpCrown::Dict(d) => {
                let Value::Dict(entries) = data else {
                    return Err(ParseError::mismatch("dict", data));
                };
                for (key, sub) in &d.map {
                    if let Some(value) = data.get(key) {
                        self.walk(sub, value, found).map_err(|e| e.at_if(self.debug_path, key.as_str()))?;
                    }
                }
                let unknown = entries.iter().filter(|(k, _)| !k.as_str().is_some_and(|k| d.map.contains_key(k)));
                match d.extra {
                    DictExtraPolicy::Skip => {}
                    DictExtraPolicy::Forbid => {
                        let fields: Vec<String> = unknown.map(|(k, _)| key_string(k)).collect();
                        if !fields.is_empty() {
                            return Err(ParseError::ExtraFields { fields });
                        }
                    }
                    DictExtraPolicy::Collect => {
                        for (k, v) in unknown {
                            found.extra.insert(key_string(k), v.clone());
                        }
                    }
                }
                Ok(())
            }
            InpCrown::List(l) => {
                let items = data.as_items().ok_or_else(|| ParseError::mismatch("list", data))?;
                for (i, (sub, value)) in l.items.iter().zip(items).enumerate() {
                    self.walk(sub, value, found).map_err(|e| e.at_if(self.debug_path, i))?;
                }
                if l.extra == ListExtraPolicy::Forbid && items.len() > l.items.len() {
                    return Err(ParseError::ExtraItems { expected: l.items.len(), got: items.len() });
                }
                Ok(())
            }
            InpCrown::Field(id) => {
                let Some(&index) = self.positions.get(id) else {
                    return Ok(());
                };
                if let Some(parser) = &self.plans[index].parser {
                    found.values[index] = Some(parser(data)?);
                }
                Ok(())
            }
            InpCrown::None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name_layout::{InpDictCrown, InpListCrown};
    use crate::pipeline::{parser, Path};
    use crate::shape::DefaultPolicy;
    use crate::types::NormType;

    fn int_parser() -> Parser {
        parser(|v| match v {
            Value::Int(n) => Ok(Value::Int(*n)),
            other => Err(ParseError::mismatch("int", other)),
        })
    }

    fn plan(id: &str, default: Option<i64>) -> InputPlan {
        let mut field = InputField::new(id, NormType::Any);
        if let Some(d) = default {
            field = field.with_default(DefaultPolicy::Value(Value::Int(d)));
        }
        InputPlan { field, parser: Some(int_parser()) }
    }

    fn record() -> Constructor {
        Constructor::new(|args| Ok(Value::record("Point", args.keyword)))
    }

    fn dict_layout(extra: DictExtraPolicy) -> InputNameLayout {
        InputNameLayout {
            crown: InpCrown::Dict(InpDictCrown {
                map: [("x", "x"), ("y", "y")]
                    .into_iter()
                    .map(|(k, id)| (k.to_string(), InpCrown::Field(id.to_string())))
                    .collect(),
                extra,
            }),
            extra_move: None,
        }
    }

    #[test]
    fn test_dict_input_with_default() {
        let model = ModelParser::new(
            vec![plan("x", None), plan("y", Some(0))],
            &dict_layout(DictExtraPolicy::Skip),
            record(),
            true,
        );
        let parsed = model.parse(&Value::dict([("x", Value::Int(1)), ("z", Value::Int(9))]));
        assert_eq!(parsed, Ok(Value::record("Point", [("x", Value::Int(1)), ("y", Value::Int(0))])));
    }

    #[test]
    fn test_forbidden_extra_keys() {
        let model =
            ModelParser::new(vec![plan("x", None), plan("y", None)], &dict_layout(DictExtraPolicy::Forbid), record(), true);
        let data = Value::dict([("x", Value::Int(1)), ("y", Value::Int(2)), ("z", Value::Int(3))]);
        assert_eq!(model.parse(&data), Err(ParseError::ExtraFields { fields: vec!["z".into()] }));
    }

    #[test]
    fn test_field_errors_carry_key_only_with_debug_path() {
        let data = Value::dict([("x", Value::str("one")), ("y", Value::Int(2))]);
        let tracked =
            ModelParser::new(vec![plan("x", None), plan("y", None)], &dict_layout(DictExtraPolicy::Skip), record(), true);
        assert_eq!(tracked.parse(&data).expect_err("mismatch").path(), Some(&Path::new(["x"])));

        let untracked =
            ModelParser::new(vec![plan("x", None), plan("y", None)], &dict_layout(DictExtraPolicy::Skip), record(), false);
        assert_eq!(untracked.parse(&data).expect_err("mismatch").path(), None);
    }

    #[test]
    fn test_short_list_input_names_first_missing_field() {
        let layout = InputNameLayout {
            crown: InpCrown::List(InpListCrown {
                items: vec![
                    InpCrown::Field("a".into()),
                    InpCrown::Field("b".into()),
                    InpCrown::Field("c".into()),
                ],
                extra: ListExtraPolicy::Forbid,
            }),
            extra_move: None,
        };
        let model = ModelParser::new(vec![plan("a", None), plan("b", None), plan("c", None)], &layout, record(), true);
        assert_eq!(
            model.parse(&Value::List(vec![Value::Int(1)])),
            Err(ParseError::MissingField { field: "b".into() })
        );
        assert_eq!(
            model.parse(&Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)])),
            Err(ParseError::ExtraItems { expected: 3, got: 4 })
        );
    }
}
