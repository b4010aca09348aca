use std::collections::VecDeque;
use std::pin::pin;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures_util::StreamExt;
use serde_json::Value;
use tokio_postgres::types::{FromSql, Type};
use tokio_postgres::{Client, Row};

use crate::results::{PendingRow, ResultSet};
use crate::translation::leading_keyword;
use crate::types::RowValues;

/// Run one statement on `client`.
///
/// Statements without result columns come back as command results carrying the server's
/// row count. Everything else is streamed into a row result; rows are decoded lazily as the
/// cursor reaches them.
///
/// # Errors
/// Returns the driver error if preparing, starting or streaming the statement fails,
/// including constraint violations raised by `INSERT ... RETURNING`.
pub(crate) async fn execute(
    client: &Client,
    sql: &str,
    params: &[RowValues],
) -> Result<ResultSet, tokio_postgres::Error> {
    let stmt = client.prepare(sql).await?;

    if stmt.columns().is_empty() {
        let affected = client.execute_raw(&stmt, params.iter()).await?;
        return Ok(ResultSet::from_command(affected, None));
    }

    let columns = stmt
        .columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect();

    // The server aborts the whole statement on error, so a failure anywhere in the stream
    // is a statement failure, never a partial result.
    let mut stream = pin!(client.query_raw(&stmt, params.iter()).await?);
    let mut pending = VecDeque::new();
    while let Some(row) = stream.next().await {
        pending.push_back(PendingRow::Postgres(row?));
    }

    let affected = if modifies_rows(sql) {
        stream.rows_affected().unwrap_or(0)
    } else {
        0
    };
    Ok(ResultSet::with_pending(columns, pending, affected))
}

/// True when the statement's leading keyword is a data-modifying one.
///
/// The command tag of a `SELECT` also carries a row count, which must not be reported as
/// affected rows.
fn modifies_rows(sql: &str) -> bool {
    let keyword = leading_keyword(sql);
    ["INSERT", "UPDATE", "DELETE", "MERGE"]
        .iter()
        .any(|k| k.eq_ignore_ascii_case(keyword))
}

/// Decode every column of `row`.
///
/// # Errors
/// Returns the driver error if a column cannot be read as its declared type.
pub(crate) fn row_values(row: &Row) -> Result<Vec<RowValues>, tokio_postgres::Error> {
    (0..row.len()).map(|idx| column_value(row, idx)).collect()
}

fn column_value(row: &Row, idx: usize) -> Result<RowValues, tokio_postgres::Error> {
    let ty = row.columns()[idx].type_();
    let value = match *ty {
        Type::INT2 => row.try_get::<_, Option<i16>>(idx)?.map(|v| RowValues::Int(v.into())),
        Type::INT4 => row.try_get::<_, Option<i32>>(idx)?.map(|v| RowValues::Int(v.into())),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx)?.map(RowValues::Int),
        Type::OID => row.try_get::<_, Option<u32>>(idx)?.map(|v| RowValues::Int(v.into())),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(idx)?
            .map(|v| RowValues::Float(v.into())),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx)?.map(RowValues::Float),
        Type::BOOL => row.try_get::<_, Option<bool>>(idx)?.map(RowValues::Bool),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(idx)?
            .map(RowValues::Timestamp),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)?
            .map(|v| RowValues::Timestamp(v.naive_utc())),
        Type::DATE => row
            .try_get::<_, Option<NaiveDate>>(idx)?
            .map(|v| RowValues::Timestamp(v.and_time(NaiveTime::MIN))),
        Type::TIME => row
            .try_get::<_, Option<NaiveTime>>(idx)?
            .map(|v| RowValues::Text(v.to_string())),
        Type::JSON | Type::JSONB => row.try_get::<_, Option<Value>>(idx)?.map(RowValues::JSON),
        Type::BYTEA => row.try_get::<_, Option<Vec<u8>>>(idx)?.map(RowValues::Blob),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            row.try_get::<_, Option<String>>(idx)?.map(RowValues::Text)
        }
        _ => row.try_get::<_, Option<RawValue>>(idx)?.map(RawValue::into_row_value),
    };
    Ok(value.unwrap_or(RowValues::Null))
}

/// Binary payload of a type without a dedicated decoder (enums, domains, `citext`, ...).
struct RawValue(Vec<u8>);

impl RawValue {
    /// Text-like types share their binary and text encodings; anything else stays bytes.
    fn into_row_value(self) -> RowValues {
        match String::from_utf8(self.0) {
            Ok(text) => RowValues::Text(text),
            Err(e) => RowValues::Blob(e.into_bytes()),
        }
    }
}

impl<'a> FromSql<'a> for RawValue {
    fn from_sql(
        _ty: &Type,
        raw: &'a [u8],
    ) -> Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        Ok(RawValue(raw.to_vec()))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}
