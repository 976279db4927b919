use bindery::{FieldDef, ModelCatalog, ModelDef, Retort, TypeHint, TypeVar, Value};
use pretty_assertions::assert_eq;
use serde_json::json;

fn var(name: &str) -> TypeHint {
    TypeHint::var(name)
}

fn catalog() -> ModelCatalog {
    ModelCatalog::new()
        .model(
            ModelDef::new("Pair")
                .param(TypeVar::new("K"))
                .param(TypeVar::new("V"))
                .field(FieldDef::new("key", var("K")))
                .field(FieldDef::new("values", TypeHint::list(var("V")))),
        )
        .model(
            ModelDef::new("Row")
                .param(TypeVar::new("H"))
                .param(TypeVar::variadic("Ts"))
                .param(TypeVar::new("T"))
                .field(FieldDef::new("head", var("H")))
                .field(FieldDef::new("cells", TypeHint::tuple(vec![TypeHint::unpacked_var("Ts")])))
                .field(FieldDef::new("tail", var("T"))),
        )
        .model(
            ModelDef::new("Base")
                .param(TypeVar::new("A"))
                .field(FieldDef::new("id", var("A")))
                .field(FieldDef::new("label", TypeHint::str())),
        )
        .model(ModelDef::new("Flag").field(FieldDef::new("enabled", TypeHint::bool())))
        .model(
            ModelDef::new("Child")
                .base(TypeHint::generic("Base", vec![TypeHint::int()]))
                .base(TypeHint::model("Flag"))
                .field(FieldDef::new("label", TypeHint::optional(TypeHint::str())).default(Value::None))
                .field(FieldDef::new("extra", TypeHint::float())),
        )
}

fn retort() -> Retort {
    Retort::builder().catalog(catalog()).build().expect("retort")
}

fn field_types(retort: &Retort, hint: TypeHint) -> Vec<(String, String)> {
    retort
        .input_shape(&hint)
        .expect("shape")
        .fields
        .iter()
        .map(|f| (f.id.clone(), f.ty.to_string()))
        .collect()
}

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items.iter().map(|(a, b)| (a.to_string(), b.to_string())).collect()
}

#[test]
fn parameters_are_substituted() {
    let retort = retort();
    assert_eq!(
        field_types(&retort, TypeHint::generic("Pair", vec![TypeHint::str(), TypeHint::int()])),
        pairs(&[("key", "str"), ("values", "list[int]")])
    );
}

#[test]
fn bare_generic_binds_any() {
    let retort = retort();
    assert_eq!(
        field_types(&retort, TypeHint::model("Pair")),
        pairs(&[("key", "Any"), ("values", "list[Any]")])
    );
}

#[test]
fn parametrized_parser_checks_arguments() {
    let retort = retort();
    let hint = TypeHint::generic("Pair", vec![TypeHint::str(), TypeHint::int()]);
    let loaded = retort.load_json(json!({"key": "k", "values": [1, 2]}), &hint).expect("load");
    assert_eq!(
        loaded,
        Value::record(
            "Pair",
            [("key", Value::str("k")), ("values", Value::List(vec![Value::Int(1), Value::Int(2)]))]
        )
    );
    assert!(retort.load_json(json!({"key": "k", "values": ["x"]}), &hint).is_err());
}

#[test]
fn variadic_parameter_takes_the_middle() {
    let retort = retort();
    let hint = TypeHint::generic("Row", vec![TypeHint::str(), TypeHint::int(), TypeHint::bool(), TypeHint::float()]);
    assert_eq!(
        field_types(&retort, hint.clone()),
        pairs(&[("head", "str"), ("cells", "tuple[int, bool]"), ("tail", "float")])
    );

    let loaded = retort.load_json(json!({"head": "h", "cells": [1, true], "tail": 0.5}), &hint).expect("load");
    match loaded {
        Value::Record { fields, .. } => {
            assert_eq!(fields[1].1, Value::Tuple(vec![Value::Int(1), Value::Bool(true)]));
        }
        other => panic!("expected a record, got {other}"),
    }
}

#[test]
fn variadic_parameter_at_the_end_may_be_empty() {
    let retort = retort();
    let hint = TypeHint::generic("Row", vec![TypeHint::str(), TypeHint::int()]);
    assert_eq!(
        field_types(&retort, hint),
        pairs(&[("head", "str"), ("cells", "tuple[()]"), ("tail", "int")])
    );
}

#[test]
fn inheritance_resolves_bases_and_overrides() {
    let retort = retort();
    let shape = retort.input_shape(&TypeHint::model("Child")).expect("shape");
    let ids: Vec<_> = shape.fields.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, ["enabled", "id", "label", "extra"]);
    assert_eq!(shape.field("id").map(|f| f.ty.to_string()).as_deref(), Some("int"));
    assert!(shape.field("label").is_some_and(|f| !f.is_required));

    let loaded = retort
        .load_json(json!({"enabled": true, "id": 7, "extra": 1.5}), &TypeHint::model("Child"))
        .expect("load");
    assert_eq!(
        loaded,
        Value::record(
            "Child",
            [
                ("enabled", Value::Bool(true)),
                ("id", Value::Int(7)),
                ("label", Value::None),
                ("extra", Value::Float(1.5)),
            ]
        )
    );
}
