use std::future::Future;

use bb8::ManageConnection;
use tokio_postgres::{Client, NoTls};

use crate::config::{DEFAULT_POSTGRES_PORT, StorageConfiguration};
use crate::error::StorageError;

/// bb8 manager for `PostgreSQL` clients.
///
/// Every connection gets its own driver task; failures of that task are only logged,
/// the client notices on its next use.
pub struct PgManager {
    config: tokio_postgres::Config,
}

impl PgManager {
    #[must_use]
    pub fn new(config: tokio_postgres::Config) -> Self {
        Self { config }
    }

    /// Translate a parsed descriptor into driver settings.
    ///
    /// Host and port fall back to `localhost:5432`; `application_name` is forwarded.
    ///
    /// # Errors
    /// Returns `StorageError::InvalidConfigurationOptions` if `connection_timeout` is malformed.
    pub fn from_configuration(cfg: &StorageConfiguration) -> Result<Self, StorageError> {
        let mut pg = tokio_postgres::Config::new();
        pg.host(cfg.host().unwrap_or("localhost"));
        pg.port(cfg.port().unwrap_or(DEFAULT_POSTGRES_PORT));
        if let Some(user) = cfg.username() {
            pg.user(user);
        }
        if let Some(password) = cfg.password() {
            pg.password(password);
        }
        if let Some(dbname) = cfg.database_name() {
            pg.dbname(dbname);
        }
        if let Some(app) = cfg.query_parameters().get("application_name") {
            pg.application_name(app);
        }
        pg.connect_timeout(cfg.connection_timeout()?);
        Ok(Self::new(pg))
    }
}

impl ManageConnection for PgManager {
    type Connection = Client;
    type Error = tokio_postgres::Error;

    #[allow(clippy::manual_async_fn)]
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send {
        let cfg = self.config.clone();
        async move {
            tracing::debug!(
                hosts = ?cfg.get_hosts(),
                dbname = ?cfg.get_dbname(),
                user = ?cfg.get_user(),
                "opening postgres connection"
            );
            let (client, connection) = cfg.connect(NoTls).await?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::warn!(error = %e, "postgres connection closed with error");
                }
            });
            Ok(client)
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn is_valid(
        &self,
        conn: &mut Self::Connection,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        async move { conn.simple_query("SELECT 1").await.map(|_| ()) }
    }

    fn has_broken(&self, conn: &mut Self::Connection) -> bool {
        conn.is_closed()
    }
}
