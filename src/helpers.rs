//! Table-level shortcuts over any [`QueryExecutor`].

use crate::error::StorageError;
use crate::executor::QueryExecutor;
use crate::query_builder::{Criterion, Order, delete_query, select_query};
use crate::results::ResultSet;

/// `SELECT *` from `table` filtered by `criteria` (ANDed), sorted by `order_by` in the
/// given order and capped at `limit` rows.
///
/// ```rust,no_run
/// use storage_sql::prelude::*;
///
/// # async fn demo(mut adapter: DatabaseAdapter) -> Result<(), StorageError> {
/// let mut rs = find(
///     &mut adapter,
///     "orders",
///     [equals_criteria("customer_id", 7)?],
///     Some(10),
///     &[("created_at", Order::Desc)],
/// )
/// .await?;
/// let latest = fetch_all(&mut rs)?;
/// # let _ = latest;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
/// Propagates the executor's failure.
pub async fn find<X, C>(
    executor: &mut X,
    table: &str,
    criteria: C,
    limit: Option<u64>,
    order_by: &[(&str, Order)],
) -> Result<ResultSet, StorageError>
where
    X: QueryExecutor + ?Sized,
    C: IntoIterator<Item = Criterion>,
{
    let mut query = select_query(table, &[]);
    for criterion in criteria {
        query = query.where_(criterion);
    }
    for (column, order) in order_by {
        query = query.order_by(column, *order);
    }
    if let Some(limit) = limit {
        query = query.limit(limit);
    }
    executor.execute_compiled(&query.compile()).await
}

/// `DELETE` the rows of `table` matching every criterion; no criteria empties the table.
///
/// # Errors
/// Propagates the executor's failure.
pub async fn remove<X, C>(executor: &mut X, table: &str, criteria: C) -> Result<u64, StorageError>
where
    X: QueryExecutor + ?Sized,
    C: IntoIterator<Item = Criterion>,
{
    let mut query = delete_query(table);
    for criterion in criteria {
        query = query.where_(criterion);
    }
    let rs = executor.execute_compiled(&query.compile()).await?;
    Ok(rs.affected_rows())
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::query_builder::{equals_criteria, greater_than_criteria};
    use crate::types::RowValues;

    #[derive(Default)]
    struct Recorder {
        statements: Vec<(String, Vec<RowValues>)>,
    }

    #[async_trait]
    impl QueryExecutor for Recorder {
        async fn execute(
            &mut self,
            sql: &str,
            params: &[RowValues],
        ) -> Result<ResultSet, StorageError> {
            self.statements.push((sql.to_string(), params.to_vec()));
            Ok(ResultSet::from_command(3, None))
        }
    }

    #[tokio::test]
    async fn find_composes_select() {
        let mut recorder = Recorder::default();
        find(
            &mut recorder,
            "test",
            [
                equals_criteria("kind", "a").unwrap(),
                greater_than_criteria("age", 3).unwrap(),
            ],
            Some(10),
            &[("a", Order::Asc), ("b", Order::Desc)],
        )
        .await
        .unwrap();

        let (sql, params) = &recorder.statements[0];
        assert_eq!(
            sql,
            r#"SELECT * FROM "test" WHERE "kind" = ? AND "age" > ? ORDER BY "a" ASC, "b" DESC LIMIT 10"#
        );
        assert_eq!(params, &[RowValues::Text("a".into()), RowValues::Int(3)]);
    }

    #[tokio::test]
    async fn remove_reports_affected_rows() {
        let mut recorder = Recorder::default();
        let removed = remove(&mut recorder, "test", Vec::new()).await.unwrap();
        assert_eq!(removed, 3);
        assert_eq!(recorder.statements[0].0, r#"DELETE FROM "test""#);
    }
}
