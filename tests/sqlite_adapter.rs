#![cfg(feature = "sqlite")]

use storage_sql::prelude::*;

async fn memory_adapter() -> Result<DatabaseAdapter, StorageError> {
    let adapter = DatabaseAdapter::from_dsn("sqlite:///:memory:").await?;
    adapter
        .execute(
            "CREATE TABLE test (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT UNIQUE, score REAL, payload BLOB)",
            &[],
        )
        .await?;
    Ok(adapter)
}

#[tokio::test]
async fn insert_then_select_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let adapter = memory_adapter().await?;

    let mut rs = adapter
        .execute_compiled(&insert_query("test", [("name", "a")])?.compile())
        .await?;
    assert!(rs.is_command());
    assert_eq!(rs.affected_rows(), 1);
    assert_eq!(rs.last_insert_id(None)?.as_deref(), Some("1"));

    let mut rs = adapter
        .execute(
            "INSERT INTO test (name, score) VALUES (?, ?)",
            &["b".into(), 2.5.into()],
        )
        .await?;
    assert_eq!(rs.last_insert_id(None)?.as_deref(), Some("2"));

    let query = select_query("test", &["id", "name", "score"])
        .where_(not_equals_criteria("id", 1)?)
        .compile();
    let mut rs = adapter.execute_compiled(&query).await?;
    assert_eq!(rs.column_names(), ["id", "name", "score"]);
    let row = fetch_one(&mut rs)?.expect("one row");
    assert_eq!(row.get("name"), Some(&RowValues::Text("b".into())));
    assert_eq!(row.get("score"), Some(&RowValues::Float(2.5)));
    Ok(())
}

#[tokio::test]
async fn fetch_helpers_follow_row_counts() -> Result<(), Box<dyn std::error::Error>> {
    let adapter = memory_adapter().await?;

    let mut empty = adapter.execute("SELECT * FROM test", &[]).await?;
    assert!(fetch_all(&mut empty)?.is_empty());
    let mut empty = adapter.execute("SELECT * FROM test", &[]).await?;
    assert!(fetch_one(&mut empty)?.is_none());

    for name in ["x", "y"] {
        adapter
            .execute("INSERT INTO test (name) VALUES (?)", &[name.into()])
            .await?;
    }

    let mut rs = adapter.execute("SELECT * FROM test", &[]).await?;
    match fetch_one(&mut rs) {
        Err(StorageError::OneResultExpected(message)) => assert_eq!(
            message,
            r#"A single record was requested, but the result of the query execution contains several ("2")"#
        ),
        other => panic!("unexpected: {other:?}"),
    }

    let mut rs = adapter
        .execute("SELECT name FROM test ORDER BY id", &[])
        .await?;
    let names: Vec<_> = fetch_all(&mut rs)?
        .into_iter()
        .map(|row| row.get("name").and_then(RowValues::as_text).map(str::to_string))
        .collect();
    assert_eq!(names, [Some("x".to_string()), Some("y".to_string())]);
    Ok(())
}

#[tokio::test]
async fn cursor_stays_exhausted() -> Result<(), Box<dyn std::error::Error>> {
    let adapter = memory_adapter().await?;
    adapter
        .execute("INSERT INTO test (name) VALUES (?)", &["only".into()])
        .await?;

    let mut rs = adapter.execute("SELECT name FROM test", &[]).await?;
    assert!(rs.current().is_none());
    assert!(rs.advance()?);
    assert_eq!(
        rs.current().and_then(|row| row.get_by_index(0)),
        Some(&RowValues::Text("only".into()))
    );
    assert!(!rs.advance()?);
    assert!(!rs.advance()?);
    assert!(rs.current().is_none());
    assert!(fetch_all(&mut rs)?.is_empty());
    Ok(())
}

#[tokio::test]
async fn duplicate_key_is_a_unique_violation() -> Result<(), Box<dyn std::error::Error>> {
    let adapter = memory_adapter().await?;
    adapter
        .execute("INSERT INTO test (id, name) VALUES (?, ?)", &[RowValues::Int(1), "dup".into()])
        .await?;

    let err = adapter
        .execute("INSERT INTO test (id, name) VALUES (?, ?)", &[RowValues::Int(2), "dup".into()])
        .await
        .expect_err("second insert must fail");
    assert!(err.is_unique_violation(), "{err:?}");
    assert!(matches!(err, StorageError::UniqueConstraintViolation { .. }));
    Ok(())
}

#[tokio::test]
async fn broken_sql_is_an_interaction_failure() -> Result<(), Box<dyn std::error::Error>> {
    let adapter = memory_adapter().await?;
    let err = adapter
        .execute("SELEC nothing FROM nowhere", &[])
        .await
        .expect_err("syntax error");
    assert!(matches!(err, StorageError::StorageInteractionFailed { .. }), "{err:?}");

    let err = adapter
        .execute("SELECT * FROM missing_table", &[])
        .await
        .expect_err("missing table");
    assert!(!err.is_connection_failure());
    Ok(())
}

#[tokio::test]
async fn affected_rows_and_helpers() -> Result<(), Box<dyn std::error::Error>> {
    let mut adapter = memory_adapter().await?;
    for (name, score) in [("a", 1.0), ("b", 2.0), ("c", 3.0)] {
        adapter
            .execute_compiled(
                &insert_query(
                    "test",
                    [("name", RowValues::from(name)), ("score", RowValues::Float(score))],
                )?
                .compile(),
            )
            .await?;
    }

    let rs = adapter
        .execute_compiled(
            &update_query("test", [("score", 0.0)])?
                .where_(greater_than_criteria("score", 1.5)?)
                .compile(),
        )
        .await?;
    assert_eq!(rs.affected_rows(), 2);

    let read = adapter.execute("SELECT * FROM test", &[]).await?;
    assert_eq!(read.affected_rows(), 0);

    let mut rs = find(
        &mut adapter,
        "test",
        [less_than_criteria("score", 0.5)?],
        Some(1),
        &[("name", Order::Desc)],
    )
    .await?;
    let rows = fetch_all(&mut rs)?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("name"), Some(&RowValues::Text("c".into())));

    let removed = remove(&mut adapter, "test", [equals_criteria("name", "a")?]).await?;
    assert_eq!(removed, 1);
    let removed = remove(&mut adapter, "test", Vec::new()).await?;
    assert_eq!(removed, 2);
    Ok(())
}

#[tokio::test]
async fn null_criteria_match_missing_values() -> Result<(), Box<dyn std::error::Error>> {
    let adapter = memory_adapter().await?;
    adapter
        .execute(
            "INSERT INTO test (name, score) VALUES (?, ?)",
            &["n".into(), RowValues::Null],
        )
        .await?;

    let query = select_query("test", &["name"])
        .where_(equals_criteria("score", None::<f64>)?)
        .compile();
    let mut rs = adapter.execute_compiled(&query).await?;
    assert_eq!(fetch_all(&mut rs)?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn blobs_pass_through_unescape() -> Result<(), Box<dyn std::error::Error>> {
    let adapter = memory_adapter().await?;
    let payload = vec![0u8, 159, 146, 150];
    adapter
        .execute(
            "INSERT INTO test (name, payload) VALUES (?, ?)",
            &["bin".into(), RowValues::Blob(payload.clone())],
        )
        .await?;

    let mut rs = adapter.execute("SELECT payload FROM test", &[]).await?;
    let row = fetch_one(&mut rs)?.expect("row");
    let stored = row.get("payload").expect("payload column");
    assert_eq!(adapter.unescape_binary(stored), payload);
    Ok(())
}

#[tokio::test]
async fn numbered_placeholders_pass_through() -> Result<(), Box<dyn std::error::Error>> {
    let adapter = memory_adapter().await?;
    adapter
        .execute("INSERT INTO test (name) VALUES ($1)", &["dollar".into()])
        .await?;
    let mut rs = adapter
        .execute(
            "SELECT count(*) AS n FROM test WHERE name = ?1 OR name = ?1",
            &["dollar".into()],
        )
        .await?;
    let row = fetch_one(&mut rs)?.expect("row");
    assert_eq!(row.get("n"), Some(&RowValues::Int(1)));
    Ok(())
}

#[tokio::test]
async fn bad_descriptors_are_configuration_errors() {
    for dsn in ["not a dsn", "mysql://localhost/db", "sqlite:///:memory:?max_connections=lots"] {
        match DatabaseAdapter::from_dsn(dsn).await {
            Err(StorageError::InvalidConfigurationOptions(_)) => {}
            other => panic!("{dsn}: unexpected {other:?}"),
        }
    }
}

#[tokio::test]
async fn closing_one_handle_keeps_clones_working() -> Result<(), Box<dyn std::error::Error>> {
    let adapter = memory_adapter().await?;
    adapter
        .execute("INSERT INTO test (name) VALUES (?)", &["kept".into()])
        .await?;

    let clone = adapter.clone();
    adapter.close();

    let mut rs = clone.execute("SELECT name FROM test", &[]).await?;
    let row = fetch_one(&mut rs)?.expect("row");
    assert_eq!(row.get("name"), Some(&RowValues::Text("kept".into())));
    Ok(())
}
