use std::collections::VecDeque;

use rusqlite::types::Value;
use rusqlite::{Connection, params_from_iter};

use super::params::from_sqlite_value;
use crate::results::{PendingRow, ResultSet};
use crate::translation::leading_keyword;
use crate::types::RowValues;

/// Run one statement on a locked connection.
///
/// A failure on the first step is a statement failure and is returned as such; a failure
/// on a later row ends the result early and surfaces when the cursor reaches it.
///
/// # Errors
/// Returns the driver error if the statement cannot be prepared or executed.
pub(crate) fn execute(
    conn: &Connection,
    sql: &str,
    params: &[RowValues],
) -> Result<ResultSet, rusqlite::Error> {
    let mut stmt = conn.prepare(sql)?;

    if stmt.column_count() == 0 {
        let changed = stmt.execute(params_from_iter(params.iter()))?;
        let affected = u64::try_from(changed).unwrap_or(u64::MAX);
        let inserted = ["INSERT", "REPLACE"]
            .iter()
            .any(|k| k.eq_ignore_ascii_case(leading_keyword(sql)));
        let last_insert_id =
            (inserted && affected > 0).then(|| conn.last_insert_rowid().to_string());
        return Ok(ResultSet::from_command(affected, last_insert_id));
    }

    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    let readonly = stmt.readonly();

    let mut pending = VecDeque::new();
    let mut rows = stmt.query(params_from_iter(params.iter()))?;
    loop {
        let next = rows.next().and_then(|row| {
            row.map(|row| {
                (0..columns.len())
                    .map(|idx| row.get::<_, Value>(idx).map(from_sqlite_value))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()
        });
        match next {
            Ok(Some(values)) => pending.push_back(PendingRow::Ready(values)),
            Ok(None) => break,
            Err(e) if pending.is_empty() => return Err(e),
            Err(e) => {
                pending.push_back(PendingRow::Failed(e.to_string()));
                break;
            }
        }
    }
    drop(rows);

    let affected = if readonly {
        0
    } else {
        u64::try_from(conn.changes()).unwrap_or(u64::MAX)
    };
    Ok(ResultSet::with_pending(columns, pending, affected))
}
