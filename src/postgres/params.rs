use std::error::Error;

use chrono::{TimeZone, Utc};
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use tokio_util::bytes;

use crate::types::RowValues;

type BoxedError = Box<dyn Error + Sync + Send>;

// Values are encoded for the parameter type the server inferred while preparing,
// so an `Int` bound to an `int4` column is narrowed instead of sent as eight bytes.
impl ToSql for RowValues {
    fn to_sql(&self, ty: &Type, out: &mut bytes::BytesMut) -> Result<IsNull, BoxedError> {
        match self {
            RowValues::Null => Ok(IsNull::Yes),
            RowValues::Int(i) => int_to_sql(*i, ty, out),
            RowValues::Float(f) => {
                if *ty == Type::FLOAT4 {
                    #[allow(clippy::cast_possible_truncation)]
                    let narrowed = *f as f32;
                    narrowed.to_sql(ty, out)
                } else {
                    f.to_sql(ty, out)
                }
            }
            RowValues::Text(s) => {
                if *ty == Type::JSON || *ty == Type::JSONB {
                    serde_json::from_str::<serde_json::Value>(s)?.to_sql(ty, out)
                } else {
                    s.to_sql(ty, out)
                }
            }
            RowValues::Bool(b) => b.to_sql(ty, out),
            RowValues::Timestamp(dt) => match *ty {
                Type::TIMESTAMPTZ => Utc.from_utc_datetime(dt).to_sql(ty, out),
                Type::DATE => dt.date().to_sql(ty, out),
                _ => dt.to_sql(ty, out),
            },
            RowValues::JSON(value) => value.to_sql(ty, out),
            RowValues::Blob(bytes) => bytes.to_sql(ty, out),
        }
    }

    fn accepts(ty: &Type) -> bool {
        matches!(
            *ty,
            Type::INT2
                | Type::INT4
                | Type::INT8
                | Type::OID
                | Type::FLOAT4
                | Type::FLOAT8
                | Type::TEXT
                | Type::VARCHAR
                | Type::BPCHAR
                | Type::CHAR
                | Type::NAME
                | Type::UNKNOWN
                | Type::BOOL
                | Type::TIMESTAMP
                | Type::TIMESTAMPTZ
                | Type::DATE
                | Type::JSON
                | Type::JSONB
                | Type::BYTEA
        )
    }

    to_sql_checked!();
}

fn int_to_sql(value: i64, ty: &Type, out: &mut bytes::BytesMut) -> Result<IsNull, BoxedError> {
    match *ty {
        Type::INT2 => i16::try_from(value)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(value)?.to_sql(ty, out),
        Type::OID => u32::try_from(value)?.to_sql(ty, out),
        #[allow(clippy::cast_precision_loss)]
        Type::FLOAT4 => (value as f32).to_sql(ty, out),
        #[allow(clippy::cast_precision_loss)]
        Type::FLOAT8 => (value as f64).to_sql(ty, out),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            value.to_string().to_sql(ty, out)
        }
        _ => value.to_sql(ty, out),
    }
}
