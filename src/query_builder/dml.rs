use indexmap::IndexMap;
use serde::Serialize;

use super::record::record_to_row;
use super::{CompiledQuery, Criterion, ToParameter, quote_identifier, where_clause};
use crate::error::StorageError;
use crate::types::RowValues;

fn collect_values<I, K, V>(values: I) -> Result<IndexMap<String, RowValues>, StorageError>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: ToParameter,
{
    values
        .into_iter()
        .map(|(column, value)| Ok((column.into(), value.to_parameter()?)))
        .collect()
}

fn returning_clause(returning: &[String], sql: &mut String) {
    if !returning.is_empty() {
        let columns = returning
            .iter()
            .map(|c| quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(" RETURNING ");
        sql.push_str(&columns);
    }
}

/// `INSERT` builder; see [`insert_query`].
#[derive(Debug, Clone, PartialEq)]
pub struct InsertQuery {
    table: String,
    values: IndexMap<String, RowValues>,
    returning: Vec<String>,
}

/// `INSERT` of column/value pairs into `table`.
///
/// ```rust
/// use storage_sql::prelude::*;
///
/// let query = insert_query("test", [("first", 1), ("second", 2)])?.compile();
/// assert_eq!(query.sql(), r#"INSERT INTO "test" ("first", "second") VALUES (?, ?)"#);
/// # Ok::<(), StorageError>(())
/// ```
///
/// # Errors
/// Returns `StorageError::IncorrectParameterCast` if a value has no scalar form.
pub fn insert_query<I, K, V>(table: &str, values: I) -> Result<InsertQuery, StorageError>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: ToParameter,
{
    Ok(InsertQuery {
        table: table.to_string(),
        values: collect_values(values)?,
        returning: Vec::new(),
    })
}

/// `INSERT` of a serializable record; see [`record_to_row`] for the field mapping.
///
/// # Errors
/// Returns `StorageError::IncorrectParameterCast` if a field is not scalar.
pub fn insert_record<R: Serialize + ?Sized>(
    table: &str,
    record: &R,
) -> Result<InsertQuery, StorageError> {
    Ok(InsertQuery {
        table: table.to_string(),
        values: record_to_row(record)?,
        returning: Vec::new(),
    })
}

impl InsertQuery {
    /// Append `RETURNING` columns, e.g. a generated key.
    #[must_use]
    pub fn returning(mut self, columns: &[&str]) -> Self {
        self.returning = columns.iter().map(ToString::to_string).collect();
        self
    }

    #[must_use]
    pub fn compile(&self) -> CompiledQuery {
        let table = quote_identifier(&self.table);
        let mut sql = if self.values.is_empty() {
            format!("INSERT INTO {table} DEFAULT VALUES")
        } else {
            let columns = self
                .values
                .keys()
                .map(|c| quote_identifier(c))
                .collect::<Vec<_>>()
                .join(", ");
            let markers = vec!["?"; self.values.len()].join(", ");
            format!("INSERT INTO {table} ({columns}) VALUES ({markers})")
        };
        returning_clause(&self.returning, &mut sql);
        CompiledQuery::new(sql, self.values.values().cloned().collect())
    }
}

/// `UPDATE` builder; see [`update_query`].
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateQuery {
    table: String,
    values: IndexMap<String, RowValues>,
    criteria: Vec<Criterion>,
    returning: Vec<String>,
}

/// `UPDATE` setting column/value pairs on `table`. Without criteria every row is updated.
///
/// # Errors
/// Returns `StorageError::IncorrectParameterCast` if a value has no scalar form.
pub fn update_query<I, K, V>(table: &str, values: I) -> Result<UpdateQuery, StorageError>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: ToParameter,
{
    Ok(UpdateQuery {
        table: table.to_string(),
        values: collect_values(values)?,
        criteria: Vec::new(),
        returning: Vec::new(),
    })
}

/// `UPDATE` with the fields of a serializable record.
///
/// # Errors
/// Returns `StorageError::IncorrectParameterCast` if a field is not scalar.
pub fn update_record<R: Serialize + ?Sized>(
    table: &str,
    record: &R,
) -> Result<UpdateQuery, StorageError> {
    Ok(UpdateQuery {
        table: table.to_string(),
        values: record_to_row(record)?,
        criteria: Vec::new(),
        returning: Vec::new(),
    })
}

impl UpdateQuery {
    #[must_use]
    pub fn where_(mut self, criterion: Criterion) -> Self {
        self.criteria.push(criterion);
        self
    }

    #[must_use]
    pub fn and_where(self, criterion: Criterion) -> Self {
        self.where_(criterion)
    }

    #[must_use]
    pub fn returning(mut self, columns: &[&str]) -> Self {
        self.returning = columns.iter().map(ToString::to_string).collect();
        self
    }

    #[must_use]
    pub fn compile(&self) -> CompiledQuery {
        let assignments = self
            .values
            .keys()
            .map(|c| format!("{} = ?", quote_identifier(c)))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!("UPDATE {} SET {assignments}", quote_identifier(&self.table));
        let mut params: Vec<RowValues> = self.values.values().cloned().collect();
        where_clause(&self.criteria, &mut sql, &mut params);
        returning_clause(&self.returning, &mut sql);
        CompiledQuery::new(sql, params)
    }
}

/// `DELETE` builder; see [`delete_query`].
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteQuery {
    table: String,
    criteria: Vec<Criterion>,
}

/// `DELETE FROM table`; without criteria every row is deleted.
#[must_use]
pub fn delete_query(table: &str) -> DeleteQuery {
    DeleteQuery {
        table: table.to_string(),
        criteria: Vec::new(),
    }
}

impl DeleteQuery {
    #[must_use]
    pub fn where_(mut self, criterion: Criterion) -> Self {
        self.criteria.push(criterion);
        self
    }

    #[must_use]
    pub fn and_where(self, criterion: Criterion) -> Self {
        self.where_(criterion)
    }

    #[must_use]
    pub fn compile(&self) -> CompiledQuery {
        let mut sql = format!("DELETE FROM {}", quote_identifier(&self.table));
        let mut params = Vec::new();
        where_clause(&self.criteria, &mut sql, &mut params);
        CompiledQuery::new(sql, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_builder::{equals_criteria, less_than_criteria};

    #[test]
    fn update_sets_then_filters() {
        let query = update_query("test", [("name", "Ivan"), ("email", "ivan@example.com")])
            .unwrap()
            .where_(equals_criteria("id", 42).unwrap())
            .compile();
        assert_eq!(
            query.sql(),
            r#"UPDATE "test" SET "name" = ?, "email" = ? WHERE "id" = ?"#
        );
        assert_eq!(
            query.params(),
            [
                RowValues::Text("Ivan".into()),
                RowValues::Text("ivan@example.com".into()),
                RowValues::Int(42)
            ]
        );
    }

    #[test]
    fn delete_without_and_with_criteria() {
        assert_eq!(delete_query("test").compile().sql(), r#"DELETE FROM "test""#);
        let query = delete_query("test")
            .where_(equals_criteria("a", 1).unwrap())
            .and_where(less_than_criteria("b", 2).unwrap())
            .compile();
        assert_eq!(query.sql(), r#"DELETE FROM "test" WHERE "a" = ? AND "b" < ?"#);
        assert_eq!(query.params(), [RowValues::Int(1), RowValues::Int(2)]);
    }

    #[test]
    fn insert_with_returning_and_defaults() {
        let query = insert_query("test", [("first", "1")])
            .unwrap()
            .returning(&["id"])
            .compile();
        assert_eq!(
            query.sql(),
            r#"INSERT INTO "test" ("first") VALUES (?) RETURNING "id""#
        );
        let empty: [(&str, i64); 0] = [];
        assert_eq!(
            insert_query("test", empty).unwrap().compile().sql(),
            r#"INSERT INTO "test" DEFAULT VALUES"#
        );
    }

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Customer {
        first_name: String,
        loyalty_points: i64,
    }

    #[test]
    fn records_map_to_snake_case_columns() {
        let customer = Customer {
            first_name: "Ann".into(),
            loyalty_points: 10,
        };
        let insert = insert_record("customers", &customer).unwrap().compile();
        assert_eq!(
            insert.sql(),
            r#"INSERT INTO "customers" ("first_name", "loyalty_points") VALUES (?, ?)"#
        );
        let update = update_record("customers", &customer)
            .unwrap()
            .where_(equals_criteria("id", 1).unwrap())
            .compile();
        assert_eq!(
            update.sql(),
            r#"UPDATE "customers" SET "first_name" = ?, "loyalty_points" = ? WHERE "id" = ?"#
        );
    }
}
