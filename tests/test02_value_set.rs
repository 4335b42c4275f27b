//! Row snapshots: lookup by name, typed access and serialization.

use sql_session::prelude::*;

fn row() -> ValueSet {
    ValueSet::from_pairs([
        ("Id", Value::Int(1)),
        ("TestValue", Value::Int(5)),
        ("Name", Value::Text("alice".into())),
        ("Missing", Value::Null),
    ])
}

#[test]
fn typed_access_by_name() -> Result<(), Box<dyn std::error::Error>> {
    let row = row();
    assert_eq!(row.get::<i32>("Id")?, 1);
    assert_eq!(row.get::<i64>("TestValue")?, 5);
    assert_eq!(row.get::<f64>("TestValue")?, 5.0);
    assert_eq!(row.get::<String>("Name")?, "alice");
    assert_eq!(row.get::<Option<i32>>("Missing")?, None);
    assert_eq!(row.value("TestValue")?, &Value::Int(5));
    assert_eq!(row.len(), 4);
    Ok(())
}

#[test]
fn unknown_column_is_not_found() -> Result<(), Box<dyn std::error::Error>> {
    let err = row().get::<i32>("Nope").unwrap_err();
    assert!(matches!(err, SqlSessionError::NotFound(_)));
    assert_eq!(err.to_string(), "Column 'Nope' couldn't be found.");
    Ok(())
}

#[test]
fn incompatible_value_is_a_conversion_error() -> Result<(), Box<dyn std::error::Error>> {
    let row = row();
    assert!(matches!(
        row.get::<i32>("Name"),
        Err(SqlSessionError::ConversionError(_))
    ));
    assert!(matches!(
        row.get::<i32>("Missing"),
        Err(SqlSessionError::ConversionError(_))
    ));
    Ok(())
}

#[test]
fn duplicate_column_names_resolve_to_the_first() -> Result<(), Box<dyn std::error::Error>> {
    let row = ValueSet::from_pairs([("a", Value::Int(1)), ("a", Value::Int(2))]);
    assert_eq!(row.get::<i32>("a")?, 1);
    assert_eq!(row.get_by_index(1), Some(&Value::Int(2)));
    Ok(())
}

#[test]
fn serializes_as_an_object_in_column_order() -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_value(row())?;
    assert_eq!(
        json,
        serde_json::json!({"Id": 1, "TestValue": 5, "Name": "alice", "Missing": null})
    );
    let row = row();
    let names: Vec<&str> = row.values().keys().collect();
    assert_eq!(names, ["Id", "TestValue", "Name", "Missing"]);
    Ok(())
}

#[test]
fn values_view_reads_by_name_and_in_order() {
    let row = ValueSet::from_pairs([
        ("a", Value::Int(1)),
        ("b", Value::Text("x".into())),
        ("a", Value::Int(2)),
    ]);
    let view = row.values();
    assert_eq!(view.len(), 3);
    assert_eq!(view.get("a"), Some(&Value::Int(1)));
    assert_eq!(view.get("nope"), None);
    assert!(view.contains_key("b"));
    let pairs: Vec<(&str, &Value)> = view.iter().collect();
    assert_eq!(
        pairs,
        [
            ("a", &Value::Int(1)),
            ("b", &Value::Text("x".into())),
            ("a", &Value::Int(2)),
        ]
    );
}
