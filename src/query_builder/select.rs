use indexmap::IndexMap;

use super::{CompiledQuery, Criterion, Order, quote_identifier, where_clause};

/// `SELECT` builder; see [`select_query`].
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    table: String,
    columns: Vec<String>,
    criteria: Vec<Criterion>,
    order_by: IndexMap<String, Order>,
    limit: Option<u64>,
    offset: Option<u64>,
}

/// Start a `SELECT` over `columns` of `table`; no columns selects `*`.
#[must_use]
pub fn select_query(table: &str, columns: &[&str]) -> SelectQuery {
    SelectQuery {
        table: table.to_string(),
        columns: columns.iter().map(ToString::to_string).collect(),
        criteria: Vec::new(),
        order_by: IndexMap::new(),
        limit: None,
        offset: None,
    }
}

impl SelectQuery {
    /// Add a filter. Filters are always combined with `AND`.
    #[must_use]
    pub fn where_(mut self, criterion: Criterion) -> Self {
        self.criteria.push(criterion);
        self
    }

    #[must_use]
    pub fn and_where(self, criterion: Criterion) -> Self {
        self.where_(criterion)
    }

    /// Sort by `column`; columns sort in the order they were added, re-adding one only
    /// changes its direction.
    #[must_use]
    pub fn order_by(mut self, column: &str, order: Order) -> Self {
        self.order_by.insert(column.to_string(), order);
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    #[must_use]
    pub fn compile(&self) -> CompiledQuery {
        let columns = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns
                .iter()
                .map(|c| quote_identifier(c))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut sql = format!("SELECT {columns} FROM {}", quote_identifier(&self.table));
        let mut params = Vec::new();
        where_clause(&self.criteria, &mut sql, &mut params);

        if !self.order_by.is_empty() {
            let order = self
                .order_by
                .iter()
                .map(|(column, order)| format!("{} {}", quote_identifier(column), order.as_sql()))
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(" ORDER BY ");
            sql.push_str(&order);
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }

        CompiledQuery::new(sql, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_builder::{equals_criteria, not_equals_criteria};
    use crate::types::RowValues;

    #[test]
    fn select_with_columns_and_criteria() {
        let query = select_query("test", &["id", "value"])
            .where_(equals_criteria("id", "uuid").unwrap())
            .compile();
        assert_eq!(query.sql(), r#"SELECT "id", "value" FROM "test" WHERE "id" = ?"#);
        assert_eq!(query.params(), [RowValues::Text("uuid".into())]);
    }

    #[test]
    fn select_star_with_ordering_and_limit() {
        let query = select_query("test", &[])
            .where_(not_equals_criteria("id", 1).unwrap())
            .and_where(equals_criteria("kind", "a").unwrap())
            .order_by("b", Order::Desc)
            .order_by("a", Order::Asc)
            .order_by("b", Order::Asc)
            .limit(10)
            .offset(20)
            .compile();
        assert_eq!(
            query.sql(),
            r#"SELECT * FROM "test" WHERE "id" != ? AND "kind" = ? ORDER BY "b" ASC, "a" ASC LIMIT 10 OFFSET 20"#
        );
        assert_eq!(query.params().len(), 2);
    }
}
