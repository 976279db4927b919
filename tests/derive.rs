use bindery::{ConversionError, Model, Retort, RetortError, Typed, TypeHint, Value};
use pretty_assertions::assert_eq;
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Model)]
struct Point {
    x: i64,
    #[model(default)]
    y: i64,
}

#[derive(Debug, Clone, PartialEq, Model)]
enum Role {
    #[model(value = "admin")]
    Admin,
    #[model(value = "guest")]
    Guest,
}

#[derive(Debug, Clone, PartialEq, Model)]
#[model(rename = "Account")]
struct User {
    name: String,
    role: Role,
    #[model(rename = "home")]
    location: Option<Point>,
    #[model(default)]
    tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Model)]
struct Node {
    value: i64,
    #[model(default)]
    children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Model)]
enum Level {
    #[model(value = 1)]
    Low,
    #[model(value = 2)]
    High,
}

#[test]
fn derived_struct_round_trips() {
    let retort = Retort::builder().register::<Point>().build().expect("retort");
    let point: Point = retort.load_as(&Value::from_json(json!({"x": 3}))).expect("load");
    assert_eq!(point, Point { x: 3, y: 0 });

    let dumped = retort.dump_from(Point { x: 1, y: 2 }).expect("dump");
    assert_eq!(dumped.to_json().expect("json"), json!({"x": 1, "y": 2}));
}

#[test]
fn registration_pulls_in_nested_types() {
    let retort = Retort::builder().register::<User>().build().expect("retort");
    for name in ["Account", "Role", "Point"] {
        assert!(retort.catalog().get(name).is_some(), "{name} is not registered");
    }

    let input = json!({"name": "ann", "role": "admin", "home": {"x": 1, "y": 2}});
    let user: User = retort.load_as(&Value::from_json(input)).expect("load");
    assert_eq!(
        user,
        User { name: "ann".into(), role: Role::Admin, location: Some(Point { x: 1, y: 2 }), tags: vec![] }
    );

    let guest = User { name: "bob".into(), role: Role::Guest, location: None, tags: vec!["new".into()] };
    assert_eq!(
        retort.dump_from(guest).expect("dump").to_json().expect("json"),
        json!({"name": "bob", "role": "guest", "home": null, "tags": ["new"]})
    );
}

#[test]
fn type_hints_name_the_model() {
    assert_eq!(User::type_hint(), TypeHint::model("Account"));
    assert_eq!(<Vec<Point>>::type_hint(), TypeHint::list(TypeHint::model("Point")));
    assert_eq!(<Option<Role>>::type_hint(), TypeHint::optional(TypeHint::model("Role")));
}

#[test]
fn recursive_derived_model() {
    let retort = Retort::builder().register::<Node>().build().expect("retort");
    let input = json!({"value": 1, "children": [{"value": 2, "children": [{"value": 3}]}, {"value": 4}]});
    let node: Node = retort.load_as(&Value::from_json(input)).expect("load");
    assert_eq!(
        node,
        Node {
            value: 1,
            children: vec![
                Node { value: 2, children: vec![Node { value: 3, children: vec![] }] },
                Node { value: 4, children: vec![] },
            ],
        }
    );
}

#[test]
fn enum_member_values_can_be_integers() {
    let retort = Retort::builder().register::<Level>().build().expect("retort");
    let level: Level = retort.load_as(&Value::Int(2)).expect("load");
    assert_eq!(level, Level::High);
    assert_eq!(retort.dump_from(Level::Low), Ok(Value::Int(1)));
    assert!(retort.load_as::<Level>(&Value::Int(3)).is_err());
}

#[test]
fn conversion_reports_the_failing_field() {
    let value = Value::record("Point", [("x", Value::str("one")), ("y", Value::Int(0))]);
    match Point::try_from(value) {
        Err(ConversionError::FieldError(field, _)) => assert_eq!(field, "x"),
        other => panic!("unexpected result: {other:?}"),
    }

    let other = Value::record("Node", [("value", Value::Int(1))]);
    assert!(matches!(Point::try_from(other), Err(ConversionError::WrongRecord { .. })));
}

#[test]
fn unregistered_types_have_no_provider() {
    let retort = Retort::default();
    assert!(matches!(
        retort.load_as::<Point>(&Value::from_json(json!({"x": 1}))),
        Err(RetortError::NoProvider { .. })
    ));
}
