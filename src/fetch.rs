//! Drain a [`ResultSet`] into rows.

use crate::error::StorageError;
use crate::results::{ResultSet, Row};

/// Collect every remaining row; an empty result yields an empty vector.
///
/// # Errors
/// Returns `StorageError::ResultSetIterationFailed` if a row cannot be read.
pub fn fetch_all(result: &mut ResultSet) -> Result<Vec<Row>, StorageError> {
    let mut rows = Vec::new();
    while result.advance()? {
        if let Some(row) = result.current() {
            rows.push(row.clone());
        }
    }
    Ok(rows)
}

/// The single row of a result, or `None` when it is empty.
///
/// ```rust
/// use storage_sql::prelude::*;
///
/// let mut rs = ResultSet::from_rows(
///     vec!["id".to_string()],
///     vec![vec![RowValues::Int(1)], vec![RowValues::Int(2)]],
/// );
/// let err = fetch_one(&mut rs).unwrap_err();
/// assert_eq!(
///     err.to_string(),
///     "A single record was requested, but the result of the query execution contains several (\"2\")"
/// );
/// ```
///
/// # Errors
/// Returns `StorageError::OneResultExpected` when the result holds more than one row, and
/// `StorageError::ResultSetIterationFailed` if a row cannot be read.
pub fn fetch_one(result: &mut ResultSet) -> Result<Option<Row>, StorageError> {
    let mut rows = fetch_all(result)?;
    if rows.len() > 1 {
        return Err(StorageError::OneResultExpected(format!(
            "A single record was requested, but the result of the query execution contains several (\"{}\")",
            rows.len()
        )));
    }
    Ok(rows.pop())
}
