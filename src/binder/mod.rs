//! Parameter binding.
//!
//! A SQL template and its positional arguments become a [`BoundStatement`] only after
//! the placeholder count has been checked against the argument count. Values are bound
//! through the driver's positional API and are never spliced into the SQL text.

mod params;
mod scanner;

use rusqlite::CachedStatement;
use rusqlite::types::Value;

use crate::error::SqlTemplateError;
use crate::types::RowValues;

pub use params::{convert_args, to_sqlite_value};
pub use scanner::count_placeholders;

/// A SQL template paired with its converted arguments, ready to prepare.
#[derive(Debug, Clone)]
pub struct BoundStatement {
    sql: String,
    values: Vec<Value>,
}

/// Validate `args` against the placeholders in `sql` and convert them.
///
/// No connection is touched here, so a failure issues nothing to the database.
///
/// # Errors
/// Returns `SqlTemplateError::BindingError` on a count mismatch, an out-of-range
/// `?NNN` index, or an argument that cannot be represented faithfully by the driver.
pub fn bind(sql: &str, args: &[RowValues]) -> Result<BoundStatement, SqlTemplateError> {
    let placeholders = count_placeholders(sql)?;
    if placeholders != args.len() {
        return Err(SqlTemplateError::BindingError(format!(
            "statement has {placeholders} placeholder(s) but {} argument(s) were supplied",
            args.len()
        )));
    }
    Ok(BoundStatement {
        sql: sql.to_owned(),
        values: convert_args(args)?,
    })
}

impl BoundStatement {
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Prepare on `conn` and bind every value by its 1-based position.
    ///
    /// # Errors
    /// Returns `BindingError` when the driver counts a different number of parameters
    /// (named parameters, for instance), otherwise `DataAccess` for driver failures.
    pub fn prepare<'conn>(
        &self,
        conn: &'conn rusqlite::Connection,
    ) -> Result<CachedStatement<'conn>, SqlTemplateError> {
        let mut stmt = conn.prepare_cached(&self.sql)?;
        let expected = stmt.parameter_count();
        if expected != self.values.len() {
            return Err(SqlTemplateError::BindingError(format!(
                "driver expects {expected} parameter(s) but {} argument(s) were supplied",
                self.values.len()
            )));
        }
        for (idx, value) in self.values.iter().enumerate() {
            stmt.raw_bind_parameter(idx + 1, value)?;
        }
        Ok(stmt)
    }
}
