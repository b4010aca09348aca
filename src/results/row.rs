use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::types::RowValues;

/// One row of a result, ordered like the statement's columns.
///
/// Column names and the name lookup table are shared by every row of the same result.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<Vec<String>>,
    index: Arc<HashMap<String, usize>>,
    values: Vec<RowValues>,
}

impl Row {
    pub(crate) fn new(
        columns: Arc<Vec<String>>,
        index: Arc<HashMap<String, usize>>,
        values: Vec<RowValues>,
    ) -> Self {
        Self {
            columns,
            index,
            values,
        }
    }

    /// Build a row outside of any result; duplicate names resolve to the first column.
    #[must_use]
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, RowValues)>,
        K: Into<String>,
    {
        let (columns, values): (Vec<String>, Vec<RowValues>) =
            pairs.into_iter().map(|(k, v)| (k.into(), v)).unzip();
        let index = Arc::new(column_index(&columns));
        Self::new(Arc::new(columns), index, values)
    }

    /// Position of a column; with duplicated names the first one wins.
    #[must_use]
    pub fn column_index(&self, column_name: &str) -> Option<usize> {
        self.index.get(column_name).copied()
    }

    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.values.get(index)
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn values(&self) -> &[RowValues] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn into_values(self) -> Vec<RowValues> {
        self.values
    }

    /// Column name to value, in column order. Later duplicates overwrite earlier ones.
    #[must_use]
    pub fn into_map(self) -> IndexMap<String, RowValues> {
        self.columns.iter().cloned().zip(self.values).collect()
    }
}

pub(crate) fn column_index(columns: &[String]) -> HashMap<String, usize> {
    let mut index = HashMap::with_capacity(columns.len());
    for (i, name) in columns.iter().enumerate() {
        index.entry(name.clone()).or_insert(i);
    }
    index
}
