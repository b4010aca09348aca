//! Bounded connection pools, one bb8 pool per backend.

mod connection;

pub(crate) use connection::StorageConnection;

#[cfg(feature = "postgres")]
use crate::postgres::PgManager;
#[cfg(feature = "sqlite")]
use crate::sqlite::SqliteManager;

use crate::config::{Engine, StorageConfiguration};
use crate::error::{BackendError, StorageError};
use crate::taxonomy::classify;

/// Pool of live backend connections owned by a `DatabaseAdapter`.
#[derive(Clone)]
pub enum StoragePool {
    #[cfg(feature = "postgres")]
    Postgres(bb8::Pool<PgManager>),
    #[cfg(feature = "sqlite")]
    Sqlite(bb8::Pool<SqliteManager>),
}

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolState {
    /// Open connections, busy or idle.
    pub connections: u32,
    pub idle_connections: u32,
}

impl StoragePool {
    /// Build the pool for `cfg`'s engine.
    ///
    /// # Errors
    /// Returns `StorageError::InvalidConfigurationOptions` if the engine is not compiled in
    /// or a pool option is malformed, and a classified error if the pool cannot be built.
    pub async fn connect(cfg: &StorageConfiguration) -> Result<Self, StorageError> {
        let max_size = cfg.max_connections()?;
        let idle_timeout = Some(cfg.idle_timeout()?).filter(|d| !d.is_zero());
        let connection_timeout = cfg.connection_timeout()?;

        tracing::debug!(
            engine = ?cfg.engine(),
            max_size,
            ?idle_timeout,
            ?connection_timeout,
            "creating connection pool"
        );

        match cfg.engine() {
            #[cfg(feature = "postgres")]
            Engine::Postgres => {
                let manager = PgManager::from_configuration(cfg)?;
                let pool = bb8::Pool::builder()
                    .max_size(max_size)
                    .idle_timeout(idle_timeout)
                    .connection_timeout(connection_timeout)
                    .build(manager)
                    .await
                    .map_err(|e| classify(BackendError::from(e)))?;
                Ok(StoragePool::Postgres(pool))
            }
            #[cfg(feature = "sqlite")]
            Engine::Sqlite => {
                let manager = SqliteManager::from_configuration(cfg)?;
                let pool = bb8::Pool::builder()
                    .max_size(max_size)
                    .idle_timeout(idle_timeout)
                    .connection_timeout(connection_timeout)
                    .build(manager)
                    .await
                    .map_err(classify)?;
                Ok(StoragePool::Sqlite(pool))
            }
            #[allow(unreachable_patterns)]
            engine => Err(StorageError::InvalidConfigurationOptions(format!(
                "{engine:?} support is not compiled into this build"
            ))),
        }
    }

    /// Check out a connection, waiting up to the configured connection timeout.
    ///
    /// # Errors
    /// Returns `StorageError::ConnectionFailed` on timeout or when a new connection cannot
    /// be established.
    pub(crate) async fn get(&self) -> Result<StorageConnection, StorageError> {
        match self {
            #[cfg(feature = "postgres")]
            StoragePool::Postgres(pool) => {
                let conn = pool
                    .get_owned()
                    .await
                    .map_err(|e| classify(BackendError::from(e)))?;
                Ok(StorageConnection::Postgres(conn))
            }
            #[cfg(feature = "sqlite")]
            StoragePool::Sqlite(pool) => {
                let conn = pool
                    .get_owned()
                    .await
                    .map_err(|e| classify(BackendError::from(e)))?;
                Ok(StorageConnection::Sqlite(conn))
            }
        }
    }

    #[must_use]
    pub fn state(&self) -> PoolState {
        let (connections, idle_connections) = match self {
            #[cfg(feature = "postgres")]
            StoragePool::Postgres(pool) => {
                let state = pool.state();
                (state.connections, state.idle_connections)
            }
            #[cfg(feature = "sqlite")]
            StoragePool::Sqlite(pool) => {
                let state = pool.state();
                (state.connections, state.idle_connections)
            }
        };
        PoolState {
            connections,
            idle_connections,
        }
    }
}
