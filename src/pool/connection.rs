use bb8::PooledConnection;

#[cfg(feature = "postgres")]
use crate::postgres::PgManager;
#[cfg(feature = "sqlite")]
use crate::sqlite::SqliteManager;

use crate::error::{BackendError, StorageError};
use crate::results::ResultSet;
use crate::taxonomy::classify;
use crate::translation::{PlaceholderStyle, translate_placeholders};
use crate::types::RowValues;

/// One connection checked out of a [`super::StoragePool`]; it returns to the pool on drop.
pub(crate) enum StorageConnection {
    #[cfg(feature = "postgres")]
    Postgres(PooledConnection<'static, PgManager>),
    #[cfg(feature = "sqlite")]
    Sqlite(PooledConnection<'static, SqliteManager>),
}

impl StorageConnection {
    /// Execute one statement, logging it first. Backend failures are classified here.
    pub(crate) async fn execute(
        &mut self,
        sql: &str,
        params: &[RowValues],
        translate: bool,
    ) -> Result<ResultSet, StorageError> {
        tracing::debug!(sql, ?params, "executing statement");
        match self {
            #[cfg(feature = "postgres")]
            StorageConnection::Postgres(client) => {
                let sql = translate_placeholders(sql, PlaceholderStyle::Postgres, translate);
                crate::postgres::execute(&**client, &sql, params)
                    .await
                    .map_err(|e| classify(BackendError::from(e)))
            }
            #[cfg(feature = "sqlite")]
            StorageConnection::Sqlite(conn) => {
                let sql = translate_placeholders(sql, PlaceholderStyle::Sqlite, translate)
                    .into_owned();
                let params = params.to_vec();
                crate::sqlite::run_blocking(std::sync::Arc::clone(conn), move |conn| {
                    crate::sqlite::execute(conn, &sql, &params).map_err(BackendError::from)
                })
                .await
                .map_err(classify)
            }
        }
    }

    /// Run a parameterless control statement (`BEGIN`, `COMMIT`, `ROLLBACK`).
    pub(crate) async fn control(&mut self, sql: &'static str) -> Result<(), StorageError> {
        tracing::debug!("{sql}");
        match self {
            #[cfg(feature = "postgres")]
            StorageConnection::Postgres(client) => client
                .batch_execute(sql)
                .await
                .map_err(|e| classify(BackendError::from(e))),
            #[cfg(feature = "sqlite")]
            StorageConnection::Sqlite(conn) => {
                crate::sqlite::run_blocking(std::sync::Arc::clone(conn), move |conn| {
                    conn.execute_batch(sql).map_err(BackendError::from)
                })
                .await
                .map_err(classify)
            }
        }
    }

    /// Roll back an abandoned transaction from a synchronous context, then release.
    ///
    /// `SQLite` is rolled back in place. `PostgreSQL` needs a runtime to issue the rollback;
    /// without one it is skipped and logged.
    pub(crate) fn rollback_detached(self) {
        match self {
            #[cfg(feature = "postgres")]
            conn @ StorageConnection::Postgres(_) => {
                match tokio::runtime::Handle::try_current() {
                    Ok(handle) => {
                        handle.spawn(async move {
                            let mut conn = conn;
                            if let Err(e) = conn.control("ROLLBACK").await {
                                tracing::warn!(error = %e, "rollback of dropped transaction failed");
                            }
                        });
                    }
                    Err(_) => {
                        tracing::warn!("transaction dropped outside a runtime; rollback skipped");
                    }
                };
            }
            #[cfg(feature = "sqlite")]
            StorageConnection::Sqlite(conn) => {
                tracing::debug!("ROLLBACK");
                match conn.try_lock() {
                    Ok(guard) => {
                        if let Err(e) = guard.execute_batch("ROLLBACK") {
                            tracing::warn!(error = %e, "rollback of dropped transaction failed");
                        }
                    }
                    // still busy; the pool discards connections returned mid-transaction
                    Err(_) => {
                        tracing::warn!("sqlite connection busy; dropped transaction not rolled back");
                    }
                };
            }
        }
    }
}
