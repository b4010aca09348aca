use async_trait::async_trait;

use crate::adapter::DatabaseAdapter;
use crate::error::StorageError;
use crate::query_builder::CompiledQuery;
use crate::results::ResultSet;
use crate::transaction::Transaction;
use crate::types::RowValues;

/// Anything statements can be executed against: the pool-backed adapter or an open
/// transaction. Storage helpers such as [`find`](crate::helpers::find) are generic over it.
#[async_trait]
pub trait QueryExecutor: Send {
    /// Run one statement with positional parameters.
    async fn execute(&mut self, sql: &str, params: &[RowValues])
    -> Result<ResultSet, StorageError>;

    /// Run a statement produced by one of the query builders.
    async fn execute_compiled(&mut self, query: &CompiledQuery) -> Result<ResultSet, StorageError> {
        self.execute(query.sql(), query.params()).await
    }
}

#[async_trait]
impl QueryExecutor for DatabaseAdapter {
    async fn execute(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, StorageError> {
        DatabaseAdapter::execute(self, sql, params).await
    }
}

#[async_trait]
impl QueryExecutor for Transaction {
    async fn execute(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, StorageError> {
        Transaction::execute(self, sql, params).await
    }
}
