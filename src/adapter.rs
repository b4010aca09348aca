use std::sync::Arc;

use crate::config::{Engine, StorageConfiguration};
use crate::error::StorageError;
use crate::pool::{PoolState, StoragePool};
use crate::query_builder::CompiledQuery;
use crate::results::ResultSet;
use crate::transaction::Transaction;
use crate::tx_outcome::TxOutcome;
use crate::types::RowValues;

const POSTGRES_BEGIN: &str = "BEGIN TRANSACTION ISOLATION LEVEL READ COMMITTED";
// SQLite only offers serializable isolation
const SQLITE_BEGIN: &str = "BEGIN";

/// Pool-backed entry point for executing statements and running transactions.
///
/// Cloning is cheap and shares the pool; the pool closes when the last clone is dropped,
/// and [`close`](Self::close) is just an explicit drop of one handle.
///
/// ```rust,no_run
/// use storage_sql::prelude::*;
///
/// # async fn demo() -> Result<(), StorageError> {
/// let adapter = DatabaseAdapter::from_dsn("sqlite:///:memory:").await?;
/// adapter
///     .execute("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)", &[])
///     .await?;
/// let query = insert_query("users", [("name", "alice")])?.compile();
/// adapter.execute_compiled(&query).await?;
///
/// let mut rs = adapter.execute("SELECT name FROM users", &[]).await?;
/// let users = fetch_all(&mut rs)?;
/// assert_eq!(users.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DatabaseAdapter {
    inner: Arc<AdapterInner>,
}

struct AdapterInner {
    configuration: StorageConfiguration,
    pool: StoragePool,
    translate_placeholders: bool,
}

impl DatabaseAdapter {
    /// Build the connection pool described by `configuration`.
    ///
    /// # Errors
    /// Returns `StorageError::InvalidConfigurationOptions` if the engine's client is not
    /// compiled into this build or a pool option is malformed, and a classified error if
    /// the pool cannot be created.
    pub async fn connect(configuration: StorageConfiguration) -> Result<Self, StorageError> {
        let translate_placeholders = configuration.translate_placeholders()?;
        let pool = StoragePool::connect(&configuration).await?;
        Ok(Self {
            inner: Arc::new(AdapterInner {
                configuration,
                pool,
                translate_placeholders,
            }),
        })
    }

    /// Parse `dsn` and [`connect`](Self::connect).
    ///
    /// # Errors
    /// See [`StorageConfiguration::parse`] and [`connect`](Self::connect).
    pub async fn from_dsn(dsn: &str) -> Result<Self, StorageError> {
        Self::connect(StorageConfiguration::parse(dsn)?).await
    }

    /// Run one statement on a pooled connection.
    ///
    /// # Errors
    /// Returns `ConnectionFailed` when no connection can be obtained, otherwise the
    /// classified statement failure.
    pub async fn execute(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, StorageError> {
        let mut conn = self.inner.pool.get().await?;
        conn.execute(sql, params, self.inner.translate_placeholders)
            .await
    }

    /// # Errors
    /// See [`execute`](Self::execute).
    pub async fn execute_compiled(&self, query: &CompiledQuery) -> Result<ResultSet, StorageError> {
        self.execute(query.sql(), query.params()).await
    }

    /// Begin a transaction on a connection it keeps until commit, rollback or drop.
    ///
    /// `PostgreSQL` transactions run at `READ COMMITTED`.
    ///
    /// # Errors
    /// Returns `ConnectionFailed` when no connection can be obtained, or the classified
    /// `BEGIN` failure.
    pub async fn transaction(&self) -> Result<Transaction, StorageError> {
        let mut conn = self.inner.pool.get().await?;
        let begin = match self.engine() {
            Engine::Postgres => POSTGRES_BEGIN,
            Engine::Sqlite => SQLITE_BEGIN,
        };
        conn.control(begin).await?;
        Ok(Transaction::new(
            conn,
            self.engine(),
            self.inner.translate_placeholders,
        ))
    }

    /// Run `unit` inside a transaction: commit when it returns `Ok`, roll back when it
    /// returns `Err`.
    ///
    /// Rollback failures are logged and never replace the unit's error.
    ///
    /// ```rust,no_run
    /// use storage_sql::prelude::*;
    ///
    /// # async fn demo(adapter: DatabaseAdapter) -> Result<(), StorageError> {
    /// let id = adapter
    ///     .transactional(async |tx: &mut Transaction| {
    ///         let mut rs = tx
    ///             .execute("INSERT INTO t (name) VALUES (?) RETURNING id", &["x".into()])
    ///             .await?;
    ///         rs.last_insert_id(None)
    ///     })
    ///     .await
    ///     .into_result()?;
    /// # let _ = id;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn transactional<T, E, F>(&self, unit: F) -> TxOutcome<T, E>
    where
        F: AsyncFnOnce(&mut Transaction) -> Result<T, E>,
        E: From<StorageError>,
    {
        let mut tx = match self.transaction().await {
            Ok(tx) => tx,
            Err(e) => return TxOutcome::Failed(E::from(e)),
        };

        match unit(&mut tx).await {
            Ok(value) => match tx.commit().await {
                Ok(()) => TxOutcome::Committed(value),
                Err(e) => TxOutcome::Failed(E::from(e)),
            },
            Err(e) => {
                tx.rollback().await;
                TxOutcome::RolledBack(e)
            }
        }
    }

    /// Decode a backend binary encoding into raw bytes.
    ///
    /// `PostgreSQL` `bytea` text (hex `\x...` or escape format) is decoded; byte payloads and
    /// anything that is not valid `bytea` text pass through unchanged. `SQLite` stores bytes
    /// as they are, so this is a pass-through there.
    #[must_use]
    pub fn unescape_binary(&self, payload: &RowValues) -> Vec<u8> {
        unescape_binary(self.engine(), payload)
    }

    #[must_use]
    pub fn engine(&self) -> Engine {
        self.inner.configuration.engine()
    }

    #[must_use]
    pub fn configuration(&self) -> &StorageConfiguration {
        &self.inner.configuration
    }

    #[must_use]
    pub fn pool_state(&self) -> PoolState {
        self.inner.pool.state()
    }

    /// Drop this handle.
    ///
    /// Other clones keep working; the pool and its connections close when the last
    /// clone is dropped, whether through `close` or by going out of scope.
    pub fn close(self) {
        tracing::debug!(engine = ?self.engine(), "closing storage adapter handle");
    }
}

impl std::fmt::Debug for DatabaseAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseAdapter")
            .field("configuration", &self.inner.configuration)
            .field("pool", &self.pool_state())
            .finish()
    }
}

pub(crate) fn unescape_binary(engine: Engine, payload: &RowValues) -> Vec<u8> {
    match payload {
        RowValues::Blob(bytes) => bytes.clone(),
        RowValues::Null => Vec::new(),
        RowValues::Text(text) => match engine {
            #[cfg(feature = "postgres")]
            Engine::Postgres => crate::postgres::decode_bytea_text(text)
                .unwrap_or_else(|| text.as_bytes().to_vec()),
            _ => text.as_bytes().to_vec(),
        },
        other => other.to_plain_string().unwrap_or_default().into_bytes(),
    }
}
