use std::fmt;

use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;

use super::quote_identifier;
use crate::error::StorageError;
use crate::types::RowValues;

/// Comparison applied by a [`Criterion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    IsNull,
    IsNotNull,
}

/// A single `field <operator> value` filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    field: String,
    operator: Operator,
    value: RowValues,
}

impl Criterion {
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    #[must_use]
    pub fn operator(&self) -> Operator {
        self.operator
    }

    #[must_use]
    pub fn value(&self) -> &RowValues {
        &self.value
    }

    /// Comparing with NULL through `=`/`!=` never matches, so a NULL operand turns
    /// equality into `IS NULL` and inequality into `IS NOT NULL`.
    pub(super) fn write_sql(&self, sql: &mut String, params: &mut Vec<RowValues>) {
        sql.push_str(&quote_identifier(&self.field));
        let operator = match (self.operator, self.value.is_null()) {
            (Operator::Equals, true) | (Operator::IsNull, _) => {
                sql.push_str(" IS NULL");
                return;
            }
            (Operator::NotEquals, true) | (Operator::IsNotNull, _) => {
                sql.push_str(" IS NOT NULL");
                return;
            }
            (Operator::Equals, false) => " = ?",
            (Operator::NotEquals, false) => " != ?",
            (Operator::GreaterThan, _) => " > ?",
            (Operator::LessThan, _) => " < ?",
        };
        sql.push_str(operator);
        params.push(self.value.clone());
    }
}

/// Conversion of a criterion or column value into a statement parameter.
///
/// Scalars convert directly. Composite values need a string form, either through
/// [`Stringified`] or by already being text; JSON arrays and objects are refused.
pub trait ToParameter {
    /// # Errors
    /// Returns `StorageError::IncorrectParameterCast` if the value has no scalar form.
    fn to_parameter(self) -> Result<RowValues, StorageError>;
}

macro_rules! scalar_parameter {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ToParameter for $ty {
                fn to_parameter(self) -> Result<RowValues, StorageError> {
                    Ok(RowValues::from(self))
                }
            }
        )*
    };
}

scalar_parameter!(i64, i32, f64, bool, &str, String, Vec<u8>, NaiveDateTime);

impl ToParameter for i16 {
    fn to_parameter(self) -> Result<RowValues, StorageError> {
        Ok(RowValues::Int(i64::from(self)))
    }
}

impl ToParameter for u32 {
    fn to_parameter(self) -> Result<RowValues, StorageError> {
        Ok(RowValues::Int(i64::from(self)))
    }
}

impl ToParameter for f32 {
    fn to_parameter(self) -> Result<RowValues, StorageError> {
        Ok(RowValues::Float(f64::from(self)))
    }
}

impl ToParameter for &String {
    fn to_parameter(self) -> Result<RowValues, StorageError> {
        Ok(RowValues::Text(self.clone()))
    }
}

impl ToParameter for RowValues {
    fn to_parameter(self) -> Result<RowValues, StorageError> {
        Ok(self)
    }
}

impl<T: ToParameter> ToParameter for Option<T> {
    fn to_parameter(self) -> Result<RowValues, StorageError> {
        self.map_or(Ok(RowValues::Null), ToParameter::to_parameter)
    }
}

impl ToParameter for JsonValue {
    fn to_parameter(self) -> Result<RowValues, StorageError> {
        json_to_parameter("value", self)
    }
}

/// Scalar parameter for a JSON value; `key` names it in the error message.
pub(super) fn json_to_parameter(key: &str, value: JsonValue) -> Result<RowValues, StorageError> {
    match value {
        JsonValue::Null => Ok(RowValues::Null),
        JsonValue::Bool(b) => Ok(RowValues::Bool(b)),
        JsonValue::Number(n) => Ok(n
            .as_i64()
            .map_or_else(|| RowValues::Float(n.as_f64().unwrap_or(f64::NAN)), RowValues::Int)),
        JsonValue::String(s) => Ok(RowValues::Text(s)),
        JsonValue::Array(_) => Err(scalar_expected(key, "array")),
        JsonValue::Object(_) => Err(scalar_expected(key, "object")),
    }
}

fn scalar_expected(key: &str, given: &str) -> StorageError {
    StorageError::IncorrectParameterCast(format!(
        "The \"{key}\" property must contain a scalar value. \"{given}\" given"
    ))
}

/// Binds any [`Display`](fmt::Display) value (identifiers, money, enums) as its text form.
///
/// ```rust
/// use storage_sql::prelude::*;
///
/// struct OrderId(u64);
/// impl std::fmt::Display for OrderId {
///     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
///         write!(f, "order-{}", self.0)
///     }
/// }
///
/// let c = equals_criteria("id", Stringified(OrderId(7)))?;
/// assert_eq!(c.value(), &RowValues::Text("order-7".into()));
/// # Ok::<(), StorageError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stringified<T>(pub T);

impl<T: fmt::Display> ToParameter for Stringified<T> {
    fn to_parameter(self) -> Result<RowValues, StorageError> {
        Ok(RowValues::Text(self.0.to_string()))
    }
}

/// Serializes as the display string, so records holding one bind as text.
impl<T: fmt::Display> Serialize for Stringified<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

fn criterion(
    field: &str,
    operator: Operator,
    value: impl ToParameter,
) -> Result<Criterion, StorageError> {
    Ok(Criterion {
        field: field.to_string(),
        operator,
        value: value.to_parameter()?,
    })
}

/// `field = value` (`field IS NULL` for a NULL value).
///
/// # Errors
/// Returns `StorageError::IncorrectParameterCast` if `value` has no scalar form.
pub fn equals_criteria(field: &str, value: impl ToParameter) -> Result<Criterion, StorageError> {
    criterion(field, Operator::Equals, value)
}

/// `field != value` (`field IS NOT NULL` for a NULL value).
///
/// # Errors
/// Returns `StorageError::IncorrectParameterCast` if `value` has no scalar form.
pub fn not_equals_criteria(
    field: &str,
    value: impl ToParameter,
) -> Result<Criterion, StorageError> {
    criterion(field, Operator::NotEquals, value)
}

/// `field > value`.
///
/// # Errors
/// Returns `StorageError::IncorrectParameterCast` if `value` has no scalar form.
pub fn greater_than_criteria(
    field: &str,
    value: impl ToParameter,
) -> Result<Criterion, StorageError> {
    criterion(field, Operator::GreaterThan, value)
}

/// `field < value`.
///
/// # Errors
/// Returns `StorageError::IncorrectParameterCast` if `value` has no scalar form.
pub fn less_than_criteria(field: &str, value: impl ToParameter) -> Result<Criterion, StorageError> {
    criterion(field, Operator::LessThan, value)
}

#[must_use]
pub fn is_null_criteria(field: &str) -> Criterion {
    Criterion {
        field: field.to_string(),
        operator: Operator::IsNull,
        value: RowValues::Null,
    }
}

#[must_use]
pub fn is_not_null_criteria(field: &str) -> Criterion {
    Criterion {
        field: field.to_string(),
        operator: Operator::IsNotNull,
        value: RowValues::Null,
    }
}
