//! Parameter identity and declared types.
//!
//! A set deduplicates the same parameter (or a clone of it), never by name, and a parameter's
//! declared type follows the Rust type it was built from unless given explicitly.

use sql_session::prelude::*;

#[test]
fn distinct_parameters_are_all_kept() -> Result<(), Box<dyn std::error::Error>> {
    let mut params = ParameterSet::new();
    assert!(params.add(Parameter::new("A", 1)));
    assert!(params.add(Parameter::new("B", 2)));
    assert!(params.add(Parameter::new("C", "x")));
    assert_eq!(params.len(), 3);
    Ok(())
}

#[test]
fn the_same_parameter_is_added_once() -> Result<(), Box<dyn std::error::Error>> {
    let p = Parameter::new("Id", 7);
    let mut params = ParameterSet::new();
    assert!(params.add(p.clone()));
    assert!(!params.add(p.clone()));
    assert!(!params.add(p));
    assert_eq!(params.len(), 1);
    Ok(())
}

#[test]
fn same_name_different_parameters_are_both_kept() -> Result<(), Box<dyn std::error::Error>> {
    let params: ParameterSet = [Parameter::new("Id", 1), Parameter::new("Id", 2)]
        .into_iter()
        .collect();
    assert_eq!(params.len(), 2);
    // Lookup returns the first one.
    assert_eq!(params.get("@Id").map(Parameter::value), Some(&Value::Int(1)));
    Ok(())
}

#[test]
fn declared_type_follows_the_value() -> Result<(), Box<dyn std::error::Error>> {
    let p = Parameter::new("A", 2);
    assert_eq!(p.name(), "A");
    assert_eq!(p.value(), &Value::Int(2));
    assert_eq!(p.sql_type(), &SqlType::Int);

    assert_eq!(Parameter::new("L", 2_i64).sql_type(), &SqlType::Long);
    assert_eq!(Parameter::new("S", "text").sql_type(), &SqlType::String);
    assert_eq!(Parameter::new("B", true).sql_type(), &SqlType::Bool);

    let missing: Option<i32> = None;
    let p = Parameter::new("N", missing);
    assert_eq!(p.sql_type(), &SqlType::Int);
    assert!(p.value().is_null());

    let p = Parameter::with_type("Price", SqlType::Decimal, "12.50");
    assert_eq!(p.sql_type(), &SqlType::Decimal);
    assert_eq!(p.value(), &Value::Text("12.50".into()));

    let price: Decimal = "12.50".parse()?;
    let p = Parameter::new("Price", price);
    assert_eq!(p.sql_type(), &SqlType::Decimal);
    assert_eq!(p.value(), &Value::Decimal(price));

    let key = Uuid::new_v4();
    let p = Parameter::new("Key", Some(key));
    assert_eq!(p.sql_type(), &SqlType::Guid);
    assert_eq!(p.value(), &Value::Guid(key));
    Ok(())
}

#[test]
fn names_match_with_or_without_sigil() -> Result<(), Box<dyn std::error::Error>> {
    let params = ParameterSet::new().with("@Id", 1).with("Value", 2);
    assert_eq!(params.get("Id").map(Parameter::bare_name), Some("Id"));
    assert_eq!(params.get("@value").map(Parameter::name), Some("Value"));
    assert!(params.get("Other").is_none());
    Ok(())
}
