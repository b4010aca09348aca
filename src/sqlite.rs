//! `SQLite` backend: bb8 connection manager, parameter binding, row decoding.
//!
//! rusqlite is synchronous; every call runs on tokio's blocking pool while holding the
//! connection's mutex.

mod manager;
mod params;
mod query;

pub use manager::SqliteManager;
pub(crate) use manager::run_blocking;
pub(crate) use query::execute;
