use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use super::row::{Row, column_index};
use crate::error::StorageError;
use crate::types::RowValues;

/// A row the backend handed over but that has not been surfaced yet.
pub(crate) enum PendingRow {
    Ready(Vec<RowValues>),
    #[cfg(feature = "postgres")]
    Postgres(tokio_postgres::Row),
    /// The backend failed while producing this row; nothing after it is readable.
    Failed(String),
}

enum ResultKind {
    Rows {
        columns: Arc<Vec<String>>,
        index: Arc<HashMap<String, usize>>,
        pending: VecDeque<PendingRow>,
        affected: u64,
    },
    Command {
        affected: u64,
        last_insert_id: Option<String>,
    },
}

/// Forward-only cursor over the outcome of one statement.
///
/// A statement either produced rows (`SELECT`, DML with `RETURNING`) or only a command
/// tag (`INSERT`, `UPDATE`, DDL, ...). Row access follows the cursor protocol:
///
/// ```rust
/// use storage_sql::prelude::*;
///
/// let mut rs = ResultSet::from_rows(
///     vec!["id".to_string()],
///     vec![vec![RowValues::Int(1)], vec![RowValues::Int(2)]],
/// );
/// assert!(rs.current().is_none());
/// assert!(rs.advance()?);
/// assert_eq!(rs.current().and_then(|r| r.get("id")), Some(&RowValues::Int(1)));
/// assert!(rs.advance()?);
/// assert!(!rs.advance()?);
/// assert!(rs.current().is_none());
/// # Ok::<(), StorageError>(())
/// ```
pub struct ResultSet {
    kind: ResultKind,
    started: bool,
    exhausted: bool,
    current: Option<Row>,
}

impl ResultSet {
    pub(crate) fn with_pending(
        columns: Vec<String>,
        pending: VecDeque<PendingRow>,
        affected: u64,
    ) -> Self {
        let index = Arc::new(column_index(&columns));
        Self {
            kind: ResultKind::Rows {
                columns: Arc::new(columns),
                index,
                pending,
                affected,
            },
            started: false,
            exhausted: false,
            current: None,
        }
    }

    /// A row-producing result over already materialized values.
    #[must_use]
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<RowValues>>) -> Self {
        let pending = rows.into_iter().map(PendingRow::Ready).collect();
        Self::with_pending(columns, pending, 0)
    }

    /// A command result: no rows, only a change count and maybe a generated identifier.
    #[must_use]
    pub fn from_command(affected: u64, last_insert_id: Option<String>) -> Self {
        Self {
            kind: ResultKind::Command {
                affected,
                last_insert_id,
            },
            started: false,
            exhausted: false,
            current: None,
        }
    }

    /// Move to the next row.
    ///
    /// Returns `false` once the rows run out (and on every call after that) and always for
    /// command results.
    ///
    /// # Errors
    /// Returns `StorageError::ResultSetIterationFailed` if the backend could not produce
    /// the row; the cursor is exhausted afterwards.
    pub fn advance(&mut self) -> Result<bool, StorageError> {
        self.started = true;
        if self.exhausted {
            return Ok(false);
        }

        let ResultKind::Rows {
            columns,
            index,
            pending,
            ..
        } = &mut self.kind
        else {
            self.exhausted = true;
            return Ok(false);
        };

        let values = match pending.pop_front() {
            None => None,
            Some(PendingRow::Ready(values)) => Some(Ok(values)),
            #[cfg(feature = "postgres")]
            Some(PendingRow::Postgres(row)) => Some(
                crate::postgres::row_values(&row)
                    .map_err(|e| crate::taxonomy::describe_postgres(&e)),
            ),
            Some(PendingRow::Failed(message)) => Some(Err(message)),
        };

        match values {
            Some(Ok(values)) => {
                self.current = Some(Row::new(Arc::clone(columns), Arc::clone(index), values));
                Ok(true)
            }
            Some(Err(message)) => {
                self.finish();
                Err(StorageError::ResultSetIterationFailed(message))
            }
            None => {
                self.finish();
                Ok(false)
            }
        }
    }

    /// Row under the cursor; `None` before the first successful [`advance`](Self::advance)
    /// and after exhaustion.
    #[must_use]
    pub fn current(&self) -> Option<&Row> {
        self.current.as_ref()
    }

    /// Identifier generated by the statement, as text.
    ///
    /// For row results (`INSERT ... RETURNING id`) this is the first column of the current
    /// row; if iteration has not started the cursor advances once. For command results it
    /// is whatever the backend reported for the insert, if anything. `_sequence` is
    /// accepted for API parity; neither backend needs it.
    ///
    /// # Errors
    /// Returns `StorageError::ResultSetIterationFailed` if the implicit advance fails.
    pub fn last_insert_id(&mut self, _sequence: Option<&str>) -> Result<Option<String>, StorageError> {
        if let ResultKind::Command { last_insert_id, .. } = &self.kind {
            return Ok(last_insert_id.clone());
        }
        if !self.started {
            self.advance()?;
        }
        Ok(self
            .current
            .as_ref()
            .and_then(|row| row.get_by_index(0))
            .and_then(RowValues::to_plain_string))
    }

    /// Rows changed by the statement; 0 for reads.
    #[must_use]
    pub fn affected_rows(&self) -> u64 {
        match &self.kind {
            ResultKind::Rows { affected, .. } | ResultKind::Command { affected, .. } => *affected,
        }
    }

    /// Column names of a row result; empty for command results.
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        match &self.kind {
            ResultKind::Rows { columns, .. } => columns,
            ResultKind::Command { .. } => &[],
        }
    }

    #[must_use]
    pub fn is_command(&self) -> bool {
        matches!(self.kind, ResultKind::Command { .. })
    }

    fn finish(&mut self) {
        self.exhausted = true;
        self.current = None;
        if let ResultKind::Rows { pending, .. } = &mut self.kind {
            pending.clear();
        }
    }
}

impl fmt::Debug for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ResultSet");
        match &self.kind {
            ResultKind::Rows {
                columns,
                pending,
                affected,
                ..
            } => s
                .field("columns", columns)
                .field("pending_rows", &pending.len())
                .field("affected", affected),
            ResultKind::Command {
                affected,
                last_insert_id,
            } => s
                .field("affected", affected)
                .field("last_insert_id", last_insert_id),
        };
        s.field("started", &self.started)
            .field("exhausted", &self.exhausted)
            .field("current", &self.current)
            .finish()
    }
}
