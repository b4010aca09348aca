//! Criteria-driven SQL builders.
//!
//! Builders quote every identifier with double quotes and emit positional `?` markers;
//! values travel separately in the compiled parameter list. Backends that need another
//! marker style rewrite it at execution time.
//!
//! ```rust
//! use storage_sql::prelude::*;
//!
//! let query = select_query("test", &["id", "value"])
//!     .where_(equals_criteria("id", 1)?)
//!     .compile();
//! assert_eq!(query.sql(), r#"SELECT "id", "value" FROM "test" WHERE "id" = ?"#);
//! assert_eq!(query.params(), [RowValues::Int(1)]);
//! # Ok::<(), StorageError>(())
//! ```

mod criteria;
mod dml;
mod record;
mod select;

pub use criteria::{
    Criterion, Operator, Stringified, ToParameter, equals_criteria, greater_than_criteria,
    is_not_null_criteria, is_null_criteria, less_than_criteria, not_equals_criteria,
};
pub use dml::{
    DeleteQuery, InsertQuery, UpdateQuery, delete_query, insert_query, insert_record,
    update_query, update_record,
};
pub use record::{record_to_row, to_snake_case};
pub use select::{SelectQuery, select_query};

use crate::types::RowValues;

/// A statement and its ordered parameters, ready to execute.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    sql: String,
    params: Vec<RowValues>,
}

impl CompiledQuery {
    #[must_use]
    pub fn new(sql: impl Into<String>, params: Vec<RowValues>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn params(&self) -> &[RowValues] {
        &self.params
    }

    #[must_use]
    pub fn into_parts(self) -> (String, Vec<RowValues>) {
        (self.sql, self.params)
    }
}

/// Sort direction for `ORDER BY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl Order {
    fn as_sql(self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

/// Quote an identifier; dotted names are quoted per segment and `*` stays bare.
///
/// ```rust
/// use storage_sql::query_builder::quote_identifier;
///
/// assert_eq!(quote_identifier("public.users"), r#""public"."users""#);
/// assert_eq!(quote_identifier("t.*"), r#""t".*"#);
/// assert_eq!(quote_identifier(r#"we"ird"#), r#""we""ird""#);
/// ```
#[must_use]
pub fn quote_identifier(identifier: &str) -> String {
    identifier
        .split('.')
        .map(|segment| {
            if segment == "*" {
                segment.to_string()
            } else {
                format!("\"{}\"", segment.replace('"', "\"\""))
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// `WHERE a AND b ...`, or nothing without criteria.
fn where_clause(criteria: &[Criterion], sql: &mut String, params: &mut Vec<RowValues>) {
    for (i, criterion) in criteria.iter().enumerate() {
        sql.push_str(if i == 0 { " WHERE " } else { " AND " });
        criterion.write_sql(sql, params);
    }
}
