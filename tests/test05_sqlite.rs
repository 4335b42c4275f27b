//! End-to-end behaviour of a `SQLite` session on a temporary database file.
#![cfg(feature = "sqlite")]

use std::time::Duration;

use chrono::NaiveDate;
use sql_session::prelude::*;
use tempfile::TempDir;

fn new_session() -> Result<(TempDir, Session), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("test05.db");
    let mut session = Session::sqlite(format!("Data Source={}", path.display()))?;
    session.execute(
        "create table items (Id integer primary key, Value integer not null);",
        None,
    )?;
    Ok((dir, session))
}

fn item(id: i64) -> ParameterSet {
    ParameterSet::new().with("Id", id).with("Value", id)
}

fn count(session: &mut Session) -> Result<i64, SqlSessionError> {
    session.get_scalar_as("select count(*) from items", None)
}

#[test]
fn batch_inserts_every_set() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, mut session) = new_session()?;
    session.execute_batch("insert into items values(@Id, @Value)", &[item(79), item(80)])?;

    let rows = session.select("select Id, Value from items order by Id", None)?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get::<i32>("Value")?, 79);
    assert_eq!(rows[1].get::<i32>("Value")?, 80);
    Ok(())
}

#[test]
fn failing_batch_leaves_nothing_behind() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, mut session) = new_session()?;
    let err = session
        .execute_batch(
            "insert into items values(@Id, @Value)",
            &[item(81), item(82), item(81)],
        )
        .unwrap_err();
    assert!(matches!(err, SqlSessionError::SqliteError(_)));
    assert_eq!(count(&mut session)?, 0);

    // The connection is still usable.
    session.execute_batch("insert into items values(@Id, @Value)", &[item(81)])?;
    assert_eq!(count(&mut session)?, 1);
    Ok(())
}

#[test]
fn each_select_runs_a_fresh_query() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, mut session) = new_session()?;
    session.execute_batch(
        "insert into items values(@Id, @Value)",
        &[item(1), item(2), item(3)],
    )?;
    let filter = ParameterSet::new().with("Min", 2);

    let first = session.select("select Id from items where Id >= @Min order by Id", Some(&filter))?;
    let second = session.select("select Id from items where Id >= @Min order by Id", Some(&filter))?;
    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 2);
    assert_eq!(second[0].get::<i64>("Id")?, 2);
    Ok(())
}

#[test]
fn session_stays_usable_while_rows_are_pulled() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, mut session) = new_session()?;
    session.execute_batch("insert into items values(@Id, @Value)", &[item(1), item(2)])?;

    let mut rows = session.select_rows("select Id from items order by Id", None)?;
    let first = rows.next().transpose()?.map(|row| row.get::<i64>("Id")).transpose()?;
    assert_eq!(first, Some(1));

    // The result was read up front, so the write neither blocks nor shows up in it.
    session.execute_batch("insert into items values(@Id, @Value)", &[item(3)])?;
    let rest = rows
        .map(|row| row.and_then(|row| row.get::<i64>("Id")))
        .collect::<Result<Vec<_>, _>>()?;
    assert_eq!(rest, [2]);
    assert_eq!(count(&mut session)?, 3);
    Ok(())
}

#[test]
fn scalar_without_row_is_none() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, mut session) = new_session()?;
    let params = ParameterSet::new().with("Id", 999);
    assert_eq!(
        session.get_scalar("select Value from items where Id = @Id", Some(&params))?,
        None
    );
    assert_eq!(
        session.get_scalar_as::<Option<i32>>("select Value from items where Id = @Id", Some(&params))?,
        None
    );
    Ok(())
}

#[test]
fn transaction_commits_and_rolls_back() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, mut session) = new_session()?;
    session.execute_on_transaction("insert into items values(@Id, @Value)", Some(&item(1)))?;
    session.execute_on_transaction("insert into items values(@Id, @Value)", Some(&item(2)))?;
    // Visible on the same connection before commit.
    assert_eq!(count(&mut session)?, 2);
    session.commit()?;

    session.execute_batch_on_transaction(
        "insert into items values(@Id, @Value)",
        &[item(3), item(4)],
    )?;
    session.rollback()?;
    assert_eq!(count(&mut session)?, 2);
    Ok(())
}

#[test]
fn closing_the_connection_discards_the_transaction() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, mut session) = new_session()?;
    session.execute_on_transaction("insert into items values(@Id, @Value)", Some(&item(1)))?;
    session.close_connection();

    assert_eq!(count(&mut session)?, 0);
    // Commit on the new connection has nothing to commit.
    session.commit()?;
    assert_eq!(count(&mut session)?, 0);
    Ok(())
}

#[test]
fn in_memory_database_is_lost_on_close() -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::sqlite(":memory:")?;
    session.execute("create table t (Id int)", None)?;
    session.execute("insert into t values(1)", None)?;
    assert_eq!(session.get_scalar_as::<i64>("select count(*) from t", None)?, 1);

    session.close_connection();
    assert!(matches!(
        session.get_scalar("select count(*) from t", None),
        Err(SqlSessionError::SqliteError(_))
    ));
    Ok(())
}

#[test]
fn stored_procedures_are_unimplemented() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, session) = new_session()?;
    let mut session = ProcedureSession::new(session);
    let err = session
        .execute_procedure("set_value", Some(&item(1)))
        .unwrap_err();
    assert!(matches!(err, SqlSessionError::Unimplemented(_)));
    assert!(matches!(
        session.execute_procedure_batch("set_value", &[item(1)]),
        Err(SqlSessionError::Unimplemented(_))
    ));
    Ok(())
}

#[test]
fn missing_parameter_is_reported() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, mut session) = new_session()?;
    let only_id = ParameterSet::new().with("Id", 1);
    let err = session
        .execute("insert into items values(@Id, @Value)", Some(&only_id))
        .unwrap_err();
    assert!(matches!(err, SqlSessionError::ParameterError(_)));
    assert_eq!(
        err.to_string(),
        "Parameter error: no value supplied for placeholder '@Value'"
    );

    let err = session
        .execute("insert into items values(@Id, @Value)", None)
        .unwrap_err();
    assert!(matches!(err, SqlSessionError::ParameterError(_)));
    Ok(())
}

#[test]
fn unused_parameters_are_ignored() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, mut session) = new_session()?;
    let params = item(5).with("Extra", "ignored");
    session.execute("insert into items values(@Id, @Value)", Some(&params))?;
    assert_eq!(count(&mut session)?, 1);
    Ok(())
}

#[test]
fn multi_statement_script_runs_without_parameters() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, mut session) = new_session()?;
    session.execute(
        "insert into items values(1, 10); insert into items values(2, 20); update items set Value = Value + 1;",
        None,
    )?;
    assert_eq!(
        session.get_scalar_as::<i64>("select sum(Value) from items", None)?,
        32
    );
    Ok(())
}

#[test]
fn declared_types_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, mut session) = new_session()?;
    session.execute(
        "create table typed (Price real, Seen integer, At text, Note text)",
        None,
    )?;
    let at = NaiveDate::from_ymd_opt(2024, 1, 2)
        .and_then(|d| d.and_hms_opt(3, 4, 5))
        .ok_or("bad date")?;
    let mut params: ParameterSet = [
        Parameter::with_type("Price", SqlType::Decimal, "12.50"),
        Parameter::new("Seen", true),
        Parameter::new("At", at),
    ]
    .into_iter()
    .collect();
    params.add(Parameter::new("Note", None::<String>));
    session.execute(
        "insert into typed values(@Price, @Seen, @At, @Note)",
        Some(&params),
    )?;

    let rows = session.select("select Price, Seen, At, Note from typed", None)?;
    let row = &rows[0];
    assert_eq!(row.get::<f64>("Price")?, 12.5);
    assert!(row.get::<bool>("Seen")?);
    assert_eq!(row.get::<chrono::NaiveDateTime>("At")?, at);
    assert_eq!(row.get::<Option<String>>("Note")?, None);
    Ok(())
}

#[test]
fn decimal_and_guid_values_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, mut session) = new_session()?;
    session.execute("create table tagged (Price numeric, Tag text)", None)?;
    let price: Decimal = "19.25".parse()?;
    let tag = Uuid::new_v4();
    let params = ParameterSet::new().with("Price", price).with("Tag", tag);
    session.execute("insert into tagged values(@Price, @Tag)", Some(&params))?;

    let rows = session.select("select Price, Tag from tagged", None)?;
    assert_eq!(rows[0].get::<Decimal>("Price")?, price);
    assert_eq!(rows[0].get::<Uuid>("Tag")?, tag);

    let found: Option<i64> = session.get_scalar_as(
        "select count(*) from tagged where Tag = @Tag",
        Some(&ParameterSet::new().with("Tag", tag)),
    )?;
    assert_eq!(found, Some(1));
    Ok(())
}

#[test]
fn unmapped_type_is_a_config_error() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, mut session) = new_session()?;
    let params: ParameterSet = [
        Parameter::new("Id", 1),
        Parameter::with_type("Value", SqlType::Other("money".into()), 5),
    ]
    .into_iter()
    .collect();
    assert!(matches!(
        session.execute("insert into items values(@Id, @Value)", Some(&params)),
        Err(SqlSessionError::ConfigError(_))
    ));
    Ok(())
}

#[test]
fn locked_database_times_out() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let connection_string = format!("Data Source={}", dir.path().join("locked.db").display());
    let mut writer = Session::sqlite(connection_string.clone())?;
    writer.execute("create table items (Id integer primary key, Value integer)", None)?;
    writer.execute_on_transaction("insert into items values(@Id, @Value)", Some(&item(1)))?;

    let mut other = Session::sqlite(connection_string)?;
    let limit = Duration::from_millis(50);
    let err = other
        .execute_with_timeout("insert into items values(@Id, @Value)", Some(&item(2)), Some(limit))
        .unwrap_err();
    assert!(matches!(err, SqlSessionError::Timeout(t) if t == limit));

    writer.commit()?;
    other.execute("insert into items values(@Id, @Value)", Some(&item(2)))?;
    assert_eq!(other.get_scalar_as::<i64>("select count(*) from items", None)?, 2);
    Ok(())
}

#[test]
fn identity_is_the_database_file() -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::sqlite("Data Source=/var/data/app.db")?;
    assert_eq!(session.database()?, "app");
    assert_eq!(session.server()?, "/var/data/app.db");

    let session = Session::builder(DatabaseType::Sqlite, ":memory:")
        .command_timeout(Duration::from_secs(30))
        .build()?;
    assert_eq!(session.database()?, ":memory:");
    assert_eq!(session.command_timeout(), Some(Duration::from_secs(30)));
    Ok(())
}
