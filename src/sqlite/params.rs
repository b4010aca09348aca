use rusqlite::ToSql;
use rusqlite::types::{ToSqlOutput, Value, ValueRef};

use crate::types::RowValues;

// SQLite has no boolean, timestamp or JSON storage class: booleans become 0/1, timestamps
// ISO-8601 text and JSON its serialized text.
impl ToSql for RowValues {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            RowValues::Null => ToSqlOutput::Owned(Value::Null),
            RowValues::Int(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            RowValues::Float(f) => ToSqlOutput::Owned(Value::Real(*f)),
            RowValues::Bool(b) => ToSqlOutput::Owned(Value::Integer(i64::from(*b))),
            RowValues::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            RowValues::Timestamp(dt) => {
                ToSqlOutput::Owned(Value::Text(dt.format("%F %T%.f").to_string()))
            }
            RowValues::JSON(value) => ToSqlOutput::Owned(Value::Text(value.to_string())),
            RowValues::Blob(bytes) => ToSqlOutput::Borrowed(ValueRef::Blob(bytes)),
        })
    }
}

/// Storage class of a column value as a [`RowValues`].
pub(super) fn from_sqlite_value(value: Value) -> RowValues {
    match value {
        Value::Null => RowValues::Null,
        Value::Integer(i) => RowValues::Int(i),
        Value::Real(f) => RowValues::Float(f),
        Value::Text(s) => RowValues::Text(s),
        Value::Blob(b) => RowValues::Blob(b),
    }
}
