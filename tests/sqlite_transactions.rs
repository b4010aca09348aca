#![cfg(feature = "sqlite")]

use storage_sql::prelude::*;
use tempfile::TempDir;

/// File-backed adapter so separate pooled connections see each other's commits.
async fn file_adapter() -> Result<(TempDir, DatabaseAdapter), StorageError> {
    let dir = tempfile::tempdir().expect("tempdir");
    let dsn = format!("sqlite:///{}", dir.path().join("tx.db").display());
    let adapter = DatabaseAdapter::from_dsn(&dsn).await?;
    adapter
        .execute(
            "CREATE TABLE accounts (id INTEGER PRIMARY KEY, owner TEXT NOT NULL UNIQUE, balance INTEGER NOT NULL)",
            &[],
        )
        .await?;
    Ok((dir, adapter))
}

async fn count(adapter: &DatabaseAdapter) -> Result<usize, StorageError> {
    let mut rs = adapter.execute("SELECT * FROM accounts", &[]).await?;
    Ok(fetch_all(&mut rs)?.len())
}

#[tokio::test]
async fn commit_makes_writes_visible() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, adapter) = file_adapter().await?;

    let mut tx = adapter.transaction().await?;
    tx.execute(
        "INSERT INTO accounts (owner, balance) VALUES (?, ?)",
        &["ann".into(), RowValues::Int(10)],
    )
    .await?;
    let mut inside = tx.execute("SELECT owner FROM accounts", &[]).await?;
    assert_eq!(fetch_all(&mut inside)?.len(), 1);
    tx.commit().await?;

    assert_eq!(count(&adapter).await?, 1);
    Ok(())
}

#[tokio::test]
async fn rollback_discards_writes() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, adapter) = file_adapter().await?;

    let mut tx = adapter.transaction().await?;
    tx.execute(
        "INSERT INTO accounts (owner, balance) VALUES (?, ?)",
        &["bob".into(), RowValues::Int(5)],
    )
    .await?;
    tx.rollback().await;

    assert_eq!(count(&adapter).await?, 0);
    Ok(())
}

#[tokio::test]
async fn dropped_transaction_leaves_no_trace() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, adapter) = file_adapter().await?;

    {
        let mut tx = adapter.transaction().await?;
        tx.execute(
            "INSERT INTO accounts (owner, balance) VALUES (?, ?)",
            &["eve".into(), RowValues::Int(1)],
        )
        .await?;
    }

    assert_eq!(count(&adapter).await?, 0);
    // the connection went back to the pool in a usable state
    let mut tx = adapter.transaction().await?;
    tx.execute(
        "INSERT INTO accounts (owner, balance) VALUES (?, ?)",
        &["eve".into(), RowValues::Int(1)],
    )
    .await?;
    tx.commit().await?;
    assert_eq!(count(&adapter).await?, 1);
    Ok(())
}

#[tokio::test]
async fn transactional_commits_on_ok() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, adapter) = file_adapter().await?;

    let outcome = adapter
        .transactional(async |tx: &mut Transaction| {
            let query = insert_query(
                "accounts",
                [("owner", RowValues::from("kim")), ("balance", RowValues::Int(3))],
            )?
            .compile();
            let mut rs = tx.execute_compiled(&query).await?;
            rs.last_insert_id(None)
        })
        .await;

    assert!(outcome.is_committed());
    assert_eq!(outcome.into_result()?.as_deref(), Some("1"));
    assert_eq!(count(&adapter).await?, 1);
    Ok(())
}

#[derive(Debug)]
enum TransferError {
    Storage(StorageError),
    InsufficientFunds,
}

impl From<StorageError> for TransferError {
    fn from(e: StorageError) -> Self {
        TransferError::Storage(e)
    }
}

#[tokio::test]
async fn transactional_rolls_back_on_err() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, adapter) = file_adapter().await?;

    let outcome = adapter
        .transactional(async |tx: &mut Transaction| {
            tx.execute(
                "INSERT INTO accounts (owner, balance) VALUES (?, ?)",
                &["lee".into(), RowValues::Int(0)],
            )
            .await?;
            Err::<(), _>(TransferError::InsufficientFunds)
        })
        .await;

    assert!(matches!(
        outcome,
        TxOutcome::RolledBack(TransferError::InsufficientFunds)
    ));
    assert_eq!(count(&adapter).await?, 0);
    Ok(())
}

#[tokio::test]
async fn failed_statement_error_is_returned_unchanged() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, adapter) = file_adapter().await?;
    adapter
        .execute(
            "INSERT INTO accounts (owner, balance) VALUES (?, ?)",
            &["dup".into(), RowValues::Int(0)],
        )
        .await?;

    let outcome = adapter
        .transactional(async |tx: &mut Transaction| {
            tx.execute(
                "INSERT INTO accounts (owner, balance) VALUES (?, ?)",
                &["new".into(), RowValues::Int(0)],
            )
            .await?;
            tx.execute(
                "INSERT INTO accounts (owner, balance) VALUES (?, ?)",
                &["dup".into(), RowValues::Int(0)],
            )
            .await?;
            Ok::<_, StorageError>(())
        })
        .await;

    match outcome {
        TxOutcome::RolledBack(err) => assert!(err.is_unique_violation(), "{err:?}"),
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(count(&adapter).await?, 1);
    Ok(())
}

#[tokio::test]
async fn unit_error_survives_a_failing_rollback() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, adapter) = file_adapter().await?;

    let outcome = adapter
        .transactional(async |tx: &mut Transaction| {
            tx.execute(
                "INSERT INTO accounts (owner, balance) VALUES (?, ?)",
                &["max".into(), RowValues::Int(2)],
            )
            .await?;
            // leaves nothing for the adapter's own ROLLBACK to undo, so that one fails
            tx.execute("ROLLBACK", &[]).await?;
            Err::<(), _>(StorageError::IncorrectParameterCast("original".into()))
        })
        .await;

    match outcome {
        TxOutcome::RolledBack(StorageError::IncorrectParameterCast(message)) => {
            assert_eq!(message, "original");
        }
        other => panic!("unexpected: {other:?}"),
    }

    assert_eq!(count(&adapter).await?, 0);
    adapter
        .execute(
            "INSERT INTO accounts (owner, balance) VALUES (?, ?)",
            &["max".into(), RowValues::Int(2)],
        )
        .await?;
    assert_eq!(count(&adapter).await?, 1);
    Ok(())
}
