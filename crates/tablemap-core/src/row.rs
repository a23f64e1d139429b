//! Result rows returned by drivers.

use crate::value::Value;
use std::sync::Arc;

/// A single row from a query result.
///
/// Column names are shared between all rows of one result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<Vec<String>>,
    values: Vec<Value>,
}

impl Row {
    /// Create a row from shared column names and its values.
    pub fn new(columns: Arc<Vec<String>>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Column names, in result order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Value at a column index.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Value for a column name (exact match first, then case-insensitive).
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        let idx = self
            .columns
            .iter()
            .position(|c| c == name)
            .or_else(|| self.columns.iter().position(|c| c.eq_ignore_ascii_case(name)))?;
        self.values.get(idx)
    }

    /// All values, in column order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Consume the row, yielding its values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name_falls_back_to_case_insensitive() {
        let cols = Arc::new(vec!["Id".to_string(), "name".to_string()]);
        let row = Row::new(cols, vec![Value::BigInt(1), Value::Text("a".into())]);
        assert_eq!(row.get_by_name("Id"), Some(&Value::BigInt(1)));
        assert_eq!(row.get_by_name("ID"), Some(&Value::BigInt(1)));
        assert_eq!(row.get_by_name("missing"), None);
        assert_eq!(row.len(), 2);
    }
}
