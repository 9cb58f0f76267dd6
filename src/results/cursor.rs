use std::sync::Arc;

use rusqlite::Statement;
use rusqlite::types::ValueRef;

use crate::error::SqlTemplateError;
use crate::types::RowValues;

use super::row::{ColumnIndex, Row};

/// Forward-only view over the rows produced by a bound statement.
///
/// The cursor borrows the statement, so it cannot outlive the executor call that
/// opened it. Dropping it resets the statement.
pub struct ResultCursor<'stmt> {
    rows: rusqlite::Rows<'stmt>,
    columns: Arc<ColumnIndex>,
}

impl<'stmt> ResultCursor<'stmt> {
    /// Start stepping a statement whose parameters are already bound.
    pub fn open(stmt: &'stmt mut Statement<'_>) -> Self {
        let names: Vec<String> = stmt
            .column_names()
            .iter()
            .map(std::string::ToString::to_string)
            .collect();
        let columns = Arc::new(ColumnIndex::new(names));
        Self {
            rows: stmt.raw_query(),
            columns,
        }
    }

    #[must_use]
    pub fn columns(&self) -> &Arc<ColumnIndex> {
        &self.columns
    }

    /// Advance to the next row and copy its values out of the driver.
    ///
    /// # Errors
    /// Returns `SqlTemplateError::DataAccess` if stepping or reading a value fails.
    pub fn next_row(&mut self) -> Result<Option<Row>, SqlTemplateError> {
        let Some(row) = self.rows.next()? else {
            return Ok(None);
        };
        let mut values = Vec::with_capacity(self.columns.len());
        for idx in 0..self.columns.len() {
            values.push(extract_value(row, idx)?);
        }
        Ok(Some(Row::new(Arc::clone(&self.columns), values)))
    }

    /// Step the statement to completion without materializing rows.
    ///
    /// # Errors
    /// Returns `SqlTemplateError::DataAccess` if stepping fails.
    pub fn drain(&mut self) -> Result<(), SqlTemplateError> {
        while self.rows.next()?.is_some() {}
        Ok(())
    }
}

/// Extract a `RowValues` from a `SQLite` row.
///
/// TEXT that is not valid UTF-8 comes back as `Blob`, so a `String` field rejects it
/// instead of receiving replacement characters.
fn extract_value(row: &rusqlite::Row<'_>, idx: usize) -> Result<RowValues, SqlTemplateError> {
    let value = match row.get_ref(idx)? {
        ValueRef::Null => RowValues::Null,
        ValueRef::Integer(i) => RowValues::Int(i),
        ValueRef::Real(f) => RowValues::Float(f),
        ValueRef::Text(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => RowValues::Text(text.to_owned()),
            Err(_) => RowValues::Blob(bytes.to_vec()),
        },
        ValueRef::Blob(bytes) => RowValues::Blob(bytes.to_vec()),
    };
    Ok(value)
}
