//! Convenient imports for common functionality.

pub use crate::adapter::DatabaseAdapter;
pub use crate::config::{Engine, StorageConfiguration};
pub use crate::error::{BackendError, StorageError};
pub use crate::executor::QueryExecutor;
pub use crate::fetch::{fetch_all, fetch_one};
pub use crate::helpers::{find, remove};
pub use crate::pool::PoolState;
pub use crate::query_builder::{
    CompiledQuery, Criterion, DeleteQuery, InsertQuery, Operator, Order, SelectQuery,
    Stringified, ToParameter, UpdateQuery, delete_query, equals_criteria, greater_than_criteria,
    insert_query, insert_record, is_not_null_criteria, is_null_criteria, less_than_criteria,
    not_equals_criteria, record_to_row, select_query, to_snake_case, update_query,
    update_record,
};
pub use crate::results::{ResultSet, Row};
pub use crate::taxonomy::FailureKind;
pub use crate::transaction::Transaction;
pub use crate::translation::{PlaceholderStyle, translate_placeholders};
pub use crate::tx_outcome::TxOutcome;
pub use crate::types::RowValues;
