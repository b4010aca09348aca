//! Classification of raw backend failures into [`StorageError`] kinds.
//!
//! This is the only place that knows backend status codes. Adapters and transactions hand
//! every driver failure to [`classify`] exactly once; downstream code never re-classifies.

use crate::error::{BackendError, StorageError};

/// SQLSTATE codes reported for uniqueness and foreign-key breaches.
pub const POSTGRES_UNIQUE_SQLSTATES: &[&str] = &["23503", "23505"];

/// SQLSTATE codes outside classes `08`/`28` that still mean the server is unreachable.
pub const POSTGRES_CONNECTION_SQLSTATES: &[&str] = &["57P01", "57P02", "57P03"];

/// SQLSTATE classes for connection exceptions and invalid authorization.
const POSTGRES_CONNECTION_CLASSES: &[&str] = &["08", "28"];

#[cfg(feature = "sqlite")]
const SQLITE_UNIQUE_EXTENDED_CODES: &[std::os::raw::c_int] = &[
    rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
    rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY,
    rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
];

/// Backend-independent kind a failure falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Connection,
    UniqueConstraint,
    Interaction,
}

/// Classify a raw backend failure.
#[must_use]
pub fn classify(err: BackendError) -> StorageError {
    let message = describe(&err);
    let source = Some(err);
    let kind = source.as_ref().map_or(FailureKind::Interaction, failure_kind);
    match kind {
        FailureKind::Connection => StorageError::ConnectionFailed { message, source },
        FailureKind::UniqueConstraint => {
            StorageError::UniqueConstraintViolation { message, source }
        }
        FailureKind::Interaction => StorageError::StorageInteractionFailed { message, source },
    }
}

/// Single-line text for a backend failure.
///
/// `PostgreSQL` server errors carry the server's message, SQLSTATE, constraint and detail;
/// other driver errors include their cause chain.
#[must_use]
pub fn describe(err: &BackendError) -> String {
    match err {
        #[cfg(feature = "postgres")]
        BackendError::Postgres(e) => describe_postgres(e),
        other => other.to_string().replace('\n', " "),
    }
}

#[cfg(feature = "postgres")]
pub(crate) fn describe_postgres(err: &tokio_postgres::Error) -> String {
    if let Some(db) = err.as_db_error() {
        return server_message(db.message(), db.code().code(), db.constraint(), db.detail());
    }
    // the driver's own text only names the failure category ("db error", "error connecting")
    let mut text = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        let cause = inner.to_string();
        if !text.ends_with(&cause) {
            text.push_str(": ");
            text.push_str(&cause);
        }
        source = inner.source();
    }
    text.replace('\n', " ")
}

#[cfg(feature = "postgres")]
fn server_message(
    message: &str,
    code: &str,
    constraint: Option<&str>,
    detail: Option<&str>,
) -> String {
    let mut text = format!("{message} (SQLSTATE {code})");
    if let Some(constraint) = constraint {
        text.push_str(&format!(", constraint \"{constraint}\""));
    }
    if let Some(detail) = detail {
        text.push_str(": ");
        text.push_str(detail);
    }
    text.replace('\n', " ")
}

/// Decide which kind a backend failure belongs to without consuming it.
#[must_use]
pub fn failure_kind(err: &BackendError) -> FailureKind {
    match err {
        #[cfg(feature = "postgres")]
        BackendError::Postgres(e) => postgres_failure_kind(e),
        #[cfg(feature = "sqlite")]
        BackendError::Sqlite(e) => sqlite_failure_kind(e),
        BackendError::PoolTimeout => FailureKind::Connection,
        BackendError::Driver(_) => FailureKind::Interaction,
    }
}

/// Kind for a five-character SQLSTATE code.
#[must_use]
pub fn sqlstate_kind(code: &str) -> FailureKind {
    if POSTGRES_UNIQUE_SQLSTATES.contains(&code) {
        FailureKind::UniqueConstraint
    } else if POSTGRES_CONNECTION_SQLSTATES.contains(&code)
        || POSTGRES_CONNECTION_CLASSES
            .iter()
            .any(|class| code.starts_with(class))
    {
        FailureKind::Connection
    } else {
        FailureKind::Interaction
    }
}

#[cfg(feature = "postgres")]
fn postgres_failure_kind(err: &tokio_postgres::Error) -> FailureKind {
    if let Some(state) = err.code() {
        return sqlstate_kind(state.code());
    }
    if err.is_closed() {
        return FailureKind::Connection;
    }
    // Errors without a server response carry the transport failure as their source.
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        if inner.is::<std::io::Error>() {
            return FailureKind::Connection;
        }
        source = inner.source();
    }
    FailureKind::Interaction
}

#[cfg(feature = "sqlite")]
fn sqlite_failure_kind(err: &rusqlite::Error) -> FailureKind {
    match err {
        rusqlite::Error::SqliteFailure(ffi_err, _) => sqlite_code_kind(ffi_err.extended_code),
        _ => FailureKind::Interaction,
    }
}

/// Kind for a SQLite extended result code.
#[cfg(feature = "sqlite")]
#[must_use]
pub fn sqlite_code_kind(extended_code: std::os::raw::c_int) -> FailureKind {
    if SQLITE_UNIQUE_EXTENDED_CODES.contains(&extended_code) {
        return FailureKind::UniqueConstraint;
    }
    // Primary result code lives in the low byte.
    match extended_code & 0xff {
        rusqlite::ffi::SQLITE_CANTOPEN
        | rusqlite::ffi::SQLITE_NOTADB
        | rusqlite::ffi::SQLITE_PERM
        | rusqlite::ffi::SQLITE_AUTH => FailureKind::Connection,
        _ => FailureKind::Interaction,
    }
}
