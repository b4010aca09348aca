use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bb8::ManageConnection;
use rusqlite::{Connection, OpenFlags};

use crate::config::StorageConfiguration;
use crate::error::{BackendError, StorageError};
use crate::taxonomy::classify;

/// A pooled `SQLite` connection; the mutex serializes the blocking calls made on it.
pub(crate) type SharedSqliteConnection = Arc<tokio::sync::Mutex<Connection>>;

const MEMORY_DATABASE: &str = ":memory:";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

static NEXT_MEMORY_DATABASE: AtomicUsize = AtomicUsize::new(0);

/// bb8 manager for `SQLite` connections.
///
/// `:memory:` is mapped to a named shared-cache in-memory database so every pooled
/// connection of one adapter sees the same data. The manager keeps one extra connection
/// open for its whole life; the database vanishes once the manager is dropped.
pub struct SqliteManager {
    path: String,
    flags: OpenFlags,
    in_memory: bool,
    _memory_anchor: Option<Mutex<Connection>>,
}

impl SqliteManager {
    /// Manager for the database a descriptor points at (`sqlite:///:memory:` when empty).
    ///
    /// # Errors
    /// Returns `StorageError::ConnectionFailed` if the in-memory database cannot be created.
    pub fn from_configuration(cfg: &StorageConfiguration) -> Result<Self, StorageError> {
        Self::new(cfg.database_name().unwrap_or(MEMORY_DATABASE))
    }

    /// # Errors
    /// Returns `StorageError::ConnectionFailed` if the in-memory database cannot be created.
    pub fn new(database: &str) -> Result<Self, StorageError> {
        let flags = OpenFlags::default() | OpenFlags::SQLITE_OPEN_URI;
        if database != MEMORY_DATABASE {
            return Ok(Self {
                path: database.to_string(),
                flags,
                in_memory: false,
                _memory_anchor: None,
            });
        }

        let path = format!(
            "file:storage-sql-{}-{}?mode=memory&cache=shared",
            std::process::id(),
            NEXT_MEMORY_DATABASE.fetch_add(1, Ordering::Relaxed)
        );
        let anchor = Connection::open_with_flags(&path, flags)
            .map_err(|e| classify(BackendError::from(e)))?;
        Ok(Self {
            path,
            flags,
            in_memory: true,
            _memory_anchor: Some(Mutex::new(anchor)),
        })
    }

    fn open(path: &str, flags: OpenFlags, in_memory: bool) -> Result<Connection, rusqlite::Error> {
        let conn = Connection::open_with_flags(path, flags)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        if !in_memory {
            // journal_mode answers with the resulting mode, so it has to be read back
            conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
        }
        Ok(conn)
    }
}

impl ManageConnection for SqliteManager {
    type Connection = SharedSqliteConnection;
    type Error = BackendError;

    #[allow(clippy::manual_async_fn)]
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send {
        let path = self.path.clone();
        let flags = self.flags;
        let in_memory = self.in_memory;
        async move {
            tracing::debug!(path = %path, "opening sqlite connection");
            let conn = tokio::task::spawn_blocking(move || Self::open(&path, flags, in_memory))
                .await
                .map_err(|e| BackendError::Driver(format!("sqlite open task failed: {e}")))??;
            Ok(Arc::new(tokio::sync::Mutex::new(conn)))
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn is_valid(
        &self,
        conn: &mut Self::Connection,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        let handle = Arc::clone(conn);
        async move {
            run_blocking(handle, |conn| {
                conn.query_row("SELECT 1", [], |_| Ok(()))
                    .map_err(BackendError::from)
            })
            .await
        }
    }

    /// A connection handed back with a transaction still open is not reused.
    fn has_broken(&self, conn: &mut Self::Connection) -> bool {
        conn.try_lock().map_or(true, |guard| !guard.is_autocommit())
    }
}

/// Run `func` against the connection on the blocking pool.
///
/// # Errors
/// Returns whatever `func` returns, or `BackendError::Driver` if the blocking task panicked.
pub(crate) async fn run_blocking<F, R>(
    conn: SharedSqliteConnection,
    func: F,
) -> Result<R, BackendError>
where
    F: FnOnce(&mut Connection) -> Result<R, BackendError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = conn.blocking_lock();
        func(&mut guard)
    })
    .await
    .map_err(|e| BackendError::Driver(format!("sqlite blocking task failed: {e}")))?
}
