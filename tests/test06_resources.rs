//! SQL kept outside the code: embedded scripts, resource bundles and files on disk.

mod common;

use std::io::Write;

use common::FakeFactory;
use sql_session::embed_scripts;
use sql_session::prelude::*;

fn store() -> ScriptStore {
    let mut store = embed_scripts! {
        "schema/create_items.sql" => "sql/create_items.sql",
    };
    store.add_bundle(
        "queries",
        [("count_items", "select count(*) from items"), ("all_items", "select * from items")],
    );
    store
}

#[test]
fn embedded_script_is_returned_verbatim() -> Result<(), Box<dyn std::error::Error>> {
    let (factory, _) = FakeFactory::new();
    let session = Session::new(factory, "").with_scripts(store());
    let script = session.read_embedded("schema/create_items.sql")?;
    assert!(script.starts_with("create table if not exists items"));
    assert_eq!(script, include_str!("sql/create_items.sql"));
    Ok(())
}

#[test]
fn missing_embedded_script_is_not_found() -> Result<(), Box<dyn std::error::Error>> {
    let (factory, _) = FakeFactory::new();
    let session = Session::new(factory, "").with_scripts(store());
    let err = session.read_embedded("schema/drop.sql").unwrap_err();
    assert!(matches!(err, SqlSessionError::NotFound(_)));
    assert_eq!(
        err.to_string(),
        "Resource script 'schema/drop.sql' couldn't be found."
    );

    // Without a store nothing is embedded.
    let (factory, _) = FakeFactory::new();
    let bare = Session::new(factory, "");
    assert_eq!(
        bare.read_embedded("schema/create_items.sql").unwrap_err().to_string(),
        "Resource script 'schema/create_items.sql' couldn't be found."
    );
    Ok(())
}

#[test]
fn resource_items_are_looked_up_by_key() -> Result<(), Box<dyn std::error::Error>> {
    let (factory, _) = FakeFactory::new();
    let session = Session::new(factory, "").with_scripts(store());
    assert_eq!(
        session.read_resource("queries", "count_items")?,
        "select count(*) from items"
    );
    assert_eq!(
        session.read_resource("queries", "nope").unwrap_err().to_string(),
        "Resource 'queries' file doesn't contain item 'nope'."
    );
    assert_eq!(
        session.read_resource("other", "count_items").unwrap_err().to_string(),
        "Resource file 'other' couldn't be found."
    );
    Ok(())
}

#[test]
fn files_are_read_from_disk() -> Result<(), Box<dyn std::error::Error>> {
    let (factory, probe) = FakeFactory::new();
    let session = Session::new(factory, "");
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("seed.sql");
    let mut file = std::fs::File::create(&path)?;
    write!(file, "insert into items values(1, 1);")?;
    drop(file);

    assert_eq!(session.read_file(&path)?, "insert into items values(1, 1);");

    let missing = dir.path().join("missing.sql");
    let err = session.read_file(&missing).unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("File '{}' couldn't be found.", missing.display())
    );
    // Reading resources never touches the database.
    assert_eq!(probe.creates(), 0);
    Ok(())
}

#[cfg(feature = "sqlite")]
#[test]
fn embedded_script_runs_on_sqlite() -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::sqlite(":memory:")?.with_scripts(store());
    let create = session.read_embedded("schema/create_items.sql")?;
    session.execute(&create, None)?;
    session.execute("insert into items values(1, 5)", None)?;
    let count_sql = session.read_resource("queries", "count_items")?;
    assert_eq!(session.get_scalar_as::<i64>(&count_sql, None)?, 1);
    Ok(())
}
