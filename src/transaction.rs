use crate::adapter::unescape_binary;
use crate::config::Engine;
use crate::error::StorageError;
use crate::pool::StorageConnection;
use crate::results::ResultSet;
use crate::types::RowValues;

/// A unit of work bound to one pooled connection.
///
/// Obtained from [`DatabaseAdapter::transaction`](crate::DatabaseAdapter::transaction).
/// `commit` and `rollback` consume the transaction, so nothing can run on it afterwards.
/// Dropping an open transaction rolls it back before the connection returns to the pool.
pub struct Transaction {
    conn: Option<StorageConnection>,
    engine: Engine,
    translate_placeholders: bool,
    aborted: bool,
}

impl Transaction {
    pub(crate) fn new(conn: StorageConnection, engine: Engine, translate_placeholders: bool) -> Self {
        Self {
            conn: Some(conn),
            engine,
            translate_placeholders,
            aborted: false,
        }
    }

    /// Execute a statement inside the transaction.
    ///
    /// # Errors
    /// Returns `ConnectionFailed`, `UniqueConstraintViolation` or `StorageInteractionFailed`.
    pub async fn execute(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, StorageError> {
        let translate = self.translate_placeholders;
        let conn = self.conn_mut()?;
        let result = conn.execute(sql, params, translate).await;
        // PostgreSQL refuses every further statement after an error until ROLLBACK
        if result.is_err() && self.engine == Engine::Postgres {
            self.aborted = true;
        }
        result
    }

    /// Commit and release the connection.
    ///
    /// If `COMMIT` fails a best-effort `ROLLBACK` is issued before the connection is released.
    ///
    /// # Errors
    /// Returns the classified `COMMIT` failure. A `PostgreSQL` transaction in which a
    /// statement already failed is rolled back instead and reported as
    /// `StorageInteractionFailed`.
    pub async fn commit(mut self) -> Result<(), StorageError> {
        let mut conn = self.take_conn()?;
        if self.aborted {
            rollback_quietly(&mut conn).await;
            return Err(StorageError::interaction(
                "transaction was aborted by an earlier failure and has been rolled back",
            ));
        }
        if let Err(e) = conn.control("COMMIT").await {
            rollback_quietly(&mut conn).await;
            return Err(e);
        }
        Ok(())
    }

    /// Roll back and release the connection. Failures are logged, never returned.
    pub async fn rollback(mut self) {
        if let Ok(mut conn) = self.take_conn() {
            rollback_quietly(&mut conn).await;
        }
    }

    /// Decode a backend binary encoding into raw bytes; see
    /// [`DatabaseAdapter::unescape_binary`](crate::DatabaseAdapter::unescape_binary).
    #[must_use]
    pub fn unescape_binary(&self, payload: &RowValues) -> Vec<u8> {
        unescape_binary(self.engine, payload)
    }

    #[must_use]
    pub fn engine(&self) -> Engine {
        self.engine
    }

    fn conn_mut(&mut self) -> Result<&mut StorageConnection, StorageError> {
        self.conn
            .as_mut()
            .ok_or_else(|| StorageError::interaction("transaction is already finished"))
    }

    fn take_conn(&mut self) -> Result<StorageConnection, StorageError> {
        self.conn
            .take()
            .ok_or_else(|| StorageError::interaction("transaction is already finished"))
    }
}

async fn rollback_quietly(conn: &mut StorageConnection) {
    if let Err(e) = conn.control("ROLLBACK").await {
        tracing::warn!(error = %e, "rollback failed");
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            tracing::debug!("open transaction dropped; rolling back");
            conn.rollback_detached();
        }
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("engine", &self.engine)
            .field("open", &self.conn.is_some())
            .field("aborted", &self.aborted)
            .finish_non_exhaustive()
    }
}
