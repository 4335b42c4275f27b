use std::error::Error;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use tokio_util::bytes;
use uuid::Uuid;

use crate::error::SqlSessionError;
use crate::parameter::ParameterSet;
use crate::translation::translate_named_placeholders;
use crate::type_map::TypeMap;
use crate::types::{CommandKind, SqlType, Value};

/// Declared wire type for each tag; `None` lets the server infer it.
pub static POSTGRES_TYPES: LazyLock<TypeMap<Option<Type>>> = LazyLock::new(|| {
    TypeMap::new(
        "Postgres",
        [
            (SqlType::String, Some(Type::TEXT)),
            (SqlType::Int, Some(Type::INT4)),
            (SqlType::Long, Some(Type::INT8)),
            (SqlType::Bool, Some(Type::BOOL)),
            (SqlType::DateTime, Some(Type::TIMESTAMP)),
            (SqlType::Char, Some(Type::BPCHAR)),
            (SqlType::Decimal, Some(Type::NUMERIC)),
            (SqlType::Guid, Some(Type::UUID)),
            (SqlType::Float, Some(Type::FLOAT8)),
            (SqlType::Bytes, Some(Type::BYTEA)),
            (SqlType::Json, Some(Type::JSONB)),
            (SqlType::Object, None),
        ],
    )
});

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*(\.[A-Za-z_][A-Za-z0-9_$]*)?$")
        .unwrap_or_else(|e| panic!("identifier pattern is invalid: {e}"))
});

/// SQL ready for `prepare`, with the parameter names in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct PgStatement {
    pub sql: String,
    /// Parameter names bound to `$1..$n`.
    pub names: Vec<String>,
    /// Declared types for `prepare_typed`; `None` when at least one type is left to the server.
    pub types: Option<Vec<Type>>,
}

/// Render a command for Postgres.
///
/// Text commands have their `@Name` placeholders rewritten to `$n`. A stored procedure command
/// becomes `CALL name(arg => $1, ...)` with one named argument per supplied parameter.
///
/// # Errors
///
/// Returns `SqlSessionError::ParameterError` for a placeholder without a supplied value or an
/// invalid procedure or argument name, and `SqlSessionError::ConfigError` for a declared type
/// with no Postgres mapping.
pub fn build_statement(
    sql: &str,
    kind: CommandKind,
    parameters: Option<&ParameterSet>,
) -> Result<PgStatement, SqlSessionError> {
    match kind {
        CommandKind::Text => build_text(sql, parameters),
        CommandKind::StoredProcedure => build_call(sql, parameters),
    }
}

fn build_text(sql: &str, parameters: Option<&ParameterSet>) -> Result<PgStatement, SqlSessionError> {
    let mut failure: Option<SqlSessionError> = None;
    let mut bindings: Vec<Option<Type>> = Vec::new();
    let translated = translate_named_placeholders(sql, |name, ordinal| {
        if ordinal > bindings.len() {
            match binding_for(parameters, name) {
                Ok(binding) => bindings.push(binding),
                Err(err) => {
                    failure.get_or_insert(err);
                    bindings.push(None);
                }
            }
        }
        format!("${ordinal}")
    });
    if let Some(err) = failure {
        return Err(err);
    }

    Ok(PgStatement {
        sql: translated.sql.into_owned(),
        names: translated.names,
        types: declared_types(&bindings),
    })
}

fn build_call(name: &str, parameters: Option<&ParameterSet>) -> Result<PgStatement, SqlSessionError> {
    let name = name.trim();
    if !IDENTIFIER.is_match(name) {
        return Err(SqlSessionError::ParameterError(format!(
            "'{name}' is not a valid procedure name"
        )));
    }

    let mut names: Vec<String> = Vec::new();
    let mut bindings = Vec::new();
    let mut arguments = Vec::new();
    for parameter in parameters.into_iter().flatten() {
        let arg = parameter.bare_name();
        if names.iter().any(|n| n.eq_ignore_ascii_case(arg)) {
            continue;
        }
        if arg.contains('.') || !IDENTIFIER.is_match(arg) {
            return Err(SqlSessionError::ParameterError(format!(
                "'{arg}' is not a valid procedure argument name"
            )));
        }
        bindings.push(POSTGRES_TYPES.resolve(parameter.sql_type())?);
        names.push(arg.to_string());
        arguments.push(format!("{arg} => ${}", names.len()));
    }

    Ok(PgStatement {
        sql: format!("CALL {name}({})", arguments.join(", ")),
        names,
        types: declared_types(&bindings),
    })
}

fn binding_for(parameters: Option<&ParameterSet>, name: &str) -> Result<Option<Type>, SqlSessionError> {
    let parameter = parameters.and_then(|set| set.get(name)).ok_or_else(|| {
        SqlSessionError::ParameterError(format!("no value supplied for placeholder '@{name}'"))
    })?;
    POSTGRES_TYPES.resolve(parameter.sql_type())
}

fn declared_types(bindings: &[Option<Type>]) -> Option<Vec<Type>> {
    bindings.iter().cloned().collect()
}

/// The values of `parameters` in the order of `statement`'s placeholders.
///
/// # Errors
///
/// Returns `SqlSessionError::ParameterError` if a placeholder has no supplied value.
pub fn ordered_values<'a>(
    statement: &PgStatement,
    parameters: Option<&'a ParameterSet>,
) -> Result<Vec<&'a Value>, SqlSessionError> {
    statement
        .names
        .iter()
        .map(|name| {
            parameters
                .and_then(|set| set.get(name))
                .map(crate::parameter::Parameter::value)
                .ok_or_else(|| {
                    SqlSessionError::ParameterError(format!(
                        "no value supplied for placeholder '@{name}'"
                    ))
                })
        })
        .collect()
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut bytes::BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Int(i) => match *ty {
                Type::INT2 => i16::try_from(*i)?.to_sql_checked(ty, out),
                Type::INT4 => i32::try_from(*i)?.to_sql_checked(ty, out),
                Type::FLOAT4 => (*i as f32).to_sql_checked(ty, out),
                Type::FLOAT8 => (*i as f64).to_sql_checked(ty, out),
                Type::BOOL => (*i != 0).to_sql_checked(ty, out),
                Type::NUMERIC => Decimal::from(*i).to_sql_checked(ty, out),
                Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
                    i.to_string().to_sql_checked(ty, out)
                }
                _ => i.to_sql_checked(ty, out),
            },
            Value::Float(f) => match *ty {
                Type::FLOAT4 => (*f as f32).to_sql_checked(ty, out),
                Type::NUMERIC => Decimal::try_from(*f)?.to_sql_checked(ty, out),
                Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
                    f.to_string().to_sql_checked(ty, out)
                }
                _ => f.to_sql_checked(ty, out),
            },
            Value::Text(s) => match *ty {
                Type::JSON | Type::JSONB => {
                    serde_json::from_str::<JsonValue>(s)?.to_sql_checked(ty, out)
                }
                Type::NUMERIC => s.trim().parse::<Decimal>()?.to_sql_checked(ty, out),
                Type::UUID => Uuid::parse_str(s.trim())?.to_sql_checked(ty, out),
                _ => s.as_str().to_sql_checked(ty, out),
            },
            Value::Bool(b) => b.to_sql_checked(ty, out),
            Value::Timestamp(dt) => match *ty {
                Type::TEXT | Type::VARCHAR => dt.to_string().to_sql_checked(ty, out),
                _ => dt.to_sql_checked(ty, out),
            },
            Value::JSON(jsval) => match *ty {
                Type::TEXT | Type::VARCHAR => jsval.to_string().to_sql_checked(ty, out),
                _ => jsval.to_sql_checked(ty, out),
            },
            Value::Blob(blob) => match *ty {
                Type::UUID => Uuid::from_slice(blob)?.to_sql_checked(ty, out),
                _ => blob.to_sql_checked(ty, out),
            },
            Value::Decimal(d) => match *ty {
                Type::FLOAT4 | Type::FLOAT8 => {
                    let f = rust_decimal::prelude::ToPrimitive::to_f64(d)
                        .ok_or("decimal out of range for float")?;
                    f.to_sql_checked(ty, out)
                }
                Type::TEXT | Type::VARCHAR | Type::BPCHAR => d.to_string().to_sql_checked(ty, out),
                _ => d.to_sql_checked(ty, out),
            },
            Value::Guid(u) => match *ty {
                Type::TEXT | Type::VARCHAR | Type::BPCHAR => u.to_string().to_sql_checked(ty, out),
                _ => u.to_sql_checked(ty, out),
            },
        }
    }

    fn accepts(_ty: &Type) -> bool {
        // Each variant checks the target type when it delegates.
        true
    }

    to_sql_checked!();
}
