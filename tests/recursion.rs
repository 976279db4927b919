use bindery::{FieldDef, ModelCatalog, ModelDef, Path, Retort, TypeHint, Value};
use pretty_assertions::assert_eq;
use serde_json::json;

fn catalog() -> ModelCatalog {
    ModelCatalog::new()
        .model(
            ModelDef::new("Tree")
                .field(FieldDef::new("value", TypeHint::int()))
                .field(FieldDef::new("children", TypeHint::list(TypeHint::model("Tree"))).default_factory(|| Value::List(vec![]))),
        )
        .model(
            ModelDef::new("Link")
                .field(FieldDef::new("label", TypeHint::str()))
                .field(FieldDef::new("next", TypeHint::optional(TypeHint::model("Link"))).default(Value::None)),
        )
        .model(
            ModelDef::new("Department")
                .field(FieldDef::new("name", TypeHint::str()))
                .field(FieldDef::new("staff", TypeHint::list(TypeHint::model("Employee")))),
        )
        .model(
            ModelDef::new("Employee")
                .field(FieldDef::new("name", TypeHint::str()))
                .field(FieldDef::new("reports", TypeHint::optional(TypeHint::model("Department"))).default(Value::None)),
        )
}

fn retort() -> Retort {
    Retort::builder().catalog(catalog()).build().expect("retort")
}

fn tree(value: i64, children: Vec<Value>) -> Value {
    Value::record("Tree", [("value", Value::Int(value)), ("children", Value::List(children))])
}

#[test]
fn self_referencing_model_four_levels_deep() {
    let retort = retort();
    let hint = TypeHint::model("Tree");
    let input = json!({
        "value": 1,
        "children": [
            {"value": 2, "children": [{"value": 3, "children": [{"value": 4}]}]},
            {"value": 5},
        ],
    });

    let loaded = retort.load_json(input, &hint).expect("load");
    let expected = tree(1, vec![tree(2, vec![tree(3, vec![tree(4, vec![])])]), tree(5, vec![])]);
    assert_eq!(loaded, expected);

    let dumped = retort.dump_json(&loaded, &hint).expect("dump");
    assert_eq!(
        dumped,
        json!({
            "value": 1,
            "children": [
                {"value": 2, "children": [{"value": 3, "children": [{"value": 4, "children": []}]}]},
                {"value": 5, "children": []},
            ],
        })
    );
}

#[test]
fn deep_errors_carry_the_whole_path() {
    let retort = retort();
    let input = json!({"value": 1, "children": [{"value": 2, "children": [{"value": "three"}]}]});
    let err = retort.parser(&TypeHint::model("Tree")).expect("parser")(&Value::from_json(input)).expect_err("bad");
    let expected = Path(vec!["children".into(), 0usize.into(), "children".into(), 0usize.into(), "value".into()]);
    assert_eq!(err.path(), Some(&expected));
}

#[test]
fn optional_self_reference_through_union() {
    let retort = retort();
    let hint = TypeHint::model("Link");
    let input = json!({"label": "a", "next": {"label": "b", "next": {"label": "c"}}});
    let loaded = retort.load_json(input, &hint).expect("load");

    let mut depth = 0;
    let mut cursor = &loaded;
    while let Value::Record { fields, .. } = cursor {
        depth += 1;
        cursor = &fields[1].1;
    }
    assert_eq!(depth, 3);
    assert_eq!(*cursor, Value::None);

    assert_eq!(
        retort.dump_json(&loaded, &hint).expect("dump"),
        json!({"label": "a", "next": {"label": "b", "next": {"label": "c", "next": null}}})
    );
}

#[test]
fn mutually_recursive_models() {
    let retort = retort();
    let input = json!({
        "name": "root",
        "staff": [
            {"name": "ann", "reports": {"name": "sub", "staff": [{"name": "bob"}]}},
            {"name": "cid"},
        ],
    });
    let hint = TypeHint::model("Department");
    let loaded = retort.load_json(input.clone(), &hint).expect("load");
    let round = retort.dump_json(&loaded, &hint).expect("dump");
    assert_eq!(round["staff"][0]["reports"]["staff"][0]["name"], json!("bob"));
    assert_eq!(round["staff"][1]["reports"], json!(null));

    // the employee parser is built on its own as well
    assert!(retort.parser(&TypeHint::model("Employee")).is_ok());
}
