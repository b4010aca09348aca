//! `PostgreSQL` backend: bb8 connection manager, parameter encoding, row decoding.

mod bytea;
mod manager;
mod params;
mod query;

pub use bytea::decode_bytea_text;
pub use manager::PgManager;
pub(crate) use query::{execute, row_values};
