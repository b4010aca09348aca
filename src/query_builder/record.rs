use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use serde_json::Value as JsonValue;

use super::criteria::json_to_parameter;
use crate::error::StorageError;
use crate::types::RowValues;

static INNER_UPPERCASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\B[A-Z]").expect("valid uppercase pattern"));

/// `someSnakeCase` → `some_snake_case`.
#[must_use]
pub fn to_snake_case(name: &str) -> String {
    INNER_UPPERCASE.replace_all(name, "_$0").to_lowercase()
}

/// Column/value pairs of a record, keyed by the snake-cased serialized field names.
///
/// ```rust
/// use serde::Serialize;
/// use storage_sql::prelude::*;
///
/// #[derive(Serialize)]
/// #[serde(rename_all = "camelCase")]
/// struct Customer {
///     customer_id: i64,
///     display_name: Option<String>,
/// }
///
/// let row = record_to_row(&Customer { customer_id: 1, display_name: None })?;
/// assert_eq!(row.get("customer_id"), Some(&RowValues::Int(1)));
/// assert_eq!(row.get("display_name"), Some(&RowValues::Null));
/// # Ok::<(), StorageError>(())
/// ```
///
/// # Errors
/// Returns `StorageError::IncorrectParameterCast` if the record does not serialize to a
/// map or a field holds a list or a nested map.
pub fn record_to_row<R: Serialize + ?Sized>(
    record: &R,
) -> Result<IndexMap<String, RowValues>, StorageError> {
    let value = serde_json::to_value(record).map_err(|e| {
        StorageError::IncorrectParameterCast(format!("record cannot be serialized: {e}"))
    })?;
    let JsonValue::Object(fields) = value else {
        return Err(StorageError::IncorrectParameterCast(
            "record must serialize to a map of fields".to_string(),
        ));
    };

    fields
        .into_iter()
        .map(|(key, value)| {
            let column = to_snake_case(&key);
            json_to_parameter(&key, value).map(|param| (column, param))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[test]
    fn snake_case_conversion() {
        assert_eq!(to_snake_case("someSnakeCase"), "some_snake_case");
        assert_eq!(to_snake_case("SomeSnakeCase"), "some_snake_case");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
        assert_eq!(to_snake_case("id"), "id");
    }

    #[derive(Serialize)]
    struct Plain {
        #[serde(rename = "firstValue")]
        first: &'static str,
        second: i64,
    }

    #[test]
    fn fields_keep_declaration_order() {
        let row = record_to_row(&Plain {
            first: "a",
            second: 2,
        })
        .unwrap();
        let keys: Vec<_> = row.keys().map(String::as_str).collect();
        assert_eq!(keys, ["first_value", "second"]);
    }

    #[derive(Serialize)]
    struct WithList {
        key: Vec<i32>,
    }

    #[test]
    fn lists_are_refused() {
        match record_to_row(&WithList { key: vec![1] }) {
            Err(StorageError::IncorrectParameterCast(message)) => assert_eq!(
                message,
                r#"The "key" property must contain a scalar value. "array" given"#
            ),
            other => panic!("unexpected: {other:?}"),
        }
    }

    struct Sku(u32);

    impl std::fmt::Display for Sku {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "SKU-{:05}", self.0)
        }
    }

    #[derive(Serialize)]
    struct LineItem {
        sku: crate::query_builder::Stringified<Sku>,
        quantity: i64,
    }

    #[test]
    fn stringified_fields_bind_as_text() {
        let row = record_to_row(&LineItem {
            sku: crate::query_builder::Stringified(Sku(42)),
            quantity: 3,
        })
        .unwrap();
        assert_eq!(row.get("sku"), Some(&RowValues::Text("SKU-00042".into())));
        assert_eq!(row.get("quantity"), Some(&RowValues::Int(3)));
    }

    #[test]
    fn non_map_records_are_refused() {
        assert!(record_to_row(&42).is_err());
    }
}
