use std::collections::HashMap;
use std::sync::Arc;

use crate::error::SqlTemplateError;
use crate::mapper::{FieldValue, decode_field};
use crate::types::RowValues;

/// Column names of one result set plus a case-insensitive lookup table.
///
/// Built once per executed statement and shared by every row it produces.
#[derive(Debug, Clone, Default)]
pub struct ColumnIndex {
    names: Vec<String>,
    by_folded_name: HashMap<String, usize>,
}

impl ColumnIndex {
    /// Build the index. When two columns fold to the same name the first one wins.
    #[must_use]
    pub fn new(names: Vec<String>) -> Self {
        let mut by_folded_name = HashMap::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            by_folded_name.entry(name.to_lowercase()).or_insert(idx);
        }
        Self {
            names,
            by_folded_name,
        }
    }

    /// Position of `name`, compared case-insensitively.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        if let Some(&idx) = self.by_folded_name.get(name) {
            return Some(idx);
        }
        self.by_folded_name.get(&name.to_lowercase()).copied()
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A row from a database query result
///
/// This struct represents a single row from a database query result,
/// with access to both the column names and the values.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<ColumnIndex>,
    values: Vec<RowValues>,
}

impl Row {
    /// Create a new database row
    ///
    /// # Arguments
    ///
    /// * `columns` - The column index shared by the result set
    /// * `values` - The values for this row, in column order
    #[must_use]
    pub fn new(columns: Arc<ColumnIndex>, values: Vec<RowValues>) -> Self {
        Self { columns, values }
    }

    /// Get a value from the row by column name
    ///
    /// # Arguments
    ///
    /// * `column_name` - The name of the column, matched case-insensitively
    ///
    /// # Returns
    ///
    /// The value at the column, or None if the column wasn't found
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.columns
            .position(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.values.get(index)
    }

    /// Decode the named column into `F` with the same checks the derived mapper uses.
    ///
    /// # Errors
    /// Returns `SqlTemplateError::MappingError` when the column is missing, NULL for a
    /// non-nullable `F`, or holds an incompatible value.
    pub fn try_get<F: FieldValue>(&self, column_name: &str) -> Result<F, SqlTemplateError> {
        decode_field(column_name, self.get(column_name))
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        self.columns.names()
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
}
