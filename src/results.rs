//! Row cursor and row types returned by every execution.

mod result_set;
mod row;

pub use result_set::ResultSet;
pub(crate) use result_set::PendingRow;
pub use row::Row;
