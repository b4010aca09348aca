use thiserror::Error;

/// Raw failure reported by a backend driver or its pool, before classification.
///
/// Nothing outside [`crate::taxonomy`] inspects these; they travel as the `source` of a
/// classified [`StorageError`].
#[derive(Debug, Error)]
pub enum BackendError {
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    Postgres(#[from] tokio_postgres::Error),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// The pool gave up waiting for a free connection.
    #[error("timed out waiting for a pooled connection")]
    PoolTimeout,

    /// A driver-side failure that carries no structured error (join errors, closed handles).
    #[error("{0}")]
    Driver(String),
}

/// Backend-independent error kinds surfaced by every adapter, transaction and helper.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Bad connection descriptor, or the backend client is not compiled into this build.
    #[error("Invalid configuration options: {0}")]
    InvalidConfigurationOptions(String),

    /// The backend could not be reached or refused authentication.
    #[error("Connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: Option<BackendError>,
    },

    /// A uniqueness or foreign-key constraint was breached.
    #[error("Unique constraint violation: {message}")]
    UniqueConstraintViolation {
        message: String,
        #[source]
        source: Option<BackendError>,
    },

    /// Any other backend failure while executing a statement.
    #[error("Storage interaction failed: {message}")]
    StorageInteractionFailed {
        message: String,
        #[source]
        source: Option<BackendError>,
    },

    /// Pulling a row out of a result failed.
    #[error("Result set iteration failed: {0}")]
    ResultSetIterationFailed(String),

    /// Exactly one row (or none) was expected.
    #[error("{0}")]
    OneResultExpected(String),

    /// A value that is neither scalar nor stringifiable reached the query builder.
    #[error("{0}")]
    IncorrectParameterCast(String),
}

impl StorageError {
    pub(crate) fn interaction(message: impl Into<String>) -> Self {
        StorageError::StorageInteractionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// True for connectivity failures, the ones worth retrying.
    #[must_use]
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, StorageError::ConnectionFailed { .. })
    }

    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StorageError::UniqueConstraintViolation { .. })
    }

    /// The raw backend error this one was classified from, if any.
    #[must_use]
    pub fn backend_error(&self) -> Option<&BackendError> {
        match self {
            StorageError::ConnectionFailed { source, .. }
            | StorageError::UniqueConstraintViolation { source, .. }
            | StorageError::StorageInteractionFailed { source, .. } => source.as_ref(),
            _ => None,
        }
    }
}

impl<E> From<bb8::RunError<E>> for BackendError
where
    E: Into<BackendError>,
{
    fn from(err: bb8::RunError<E>) -> Self {
        match err {
            bb8::RunError::User(e) => e.into(),
            bb8::RunError::TimedOut => BackendError::PoolTimeout,
        }
    }
}
