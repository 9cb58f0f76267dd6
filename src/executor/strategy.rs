use rusqlite::Statement;

use crate::error::SqlTemplateError;
use crate::mapper::RowMapper;
use crate::results::ResultCursor;

/// How the rows of a bound statement are turned into a result.
pub trait StatementExecutor<T>: Send + Sync + 'static {
    type Output: Send + 'static;

    /// # Errors
    /// Returns mapping, cardinality, or driver errors depending on the strategy.
    fn execute(
        &self,
        stmt: &mut Statement<'_>,
        mapper: &RowMapper<T>,
    ) -> Result<Self::Output, SqlTemplateError>;
}

/// Exactly one row: zero is `NotFound`, more than one is `TooManyResults`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleResult;

/// Any number of rows, mapped in the order the cursor yields them.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManyResults;

/// A mutation: rows are stepped through and discarded, the driver's change count is
/// the result. Zero is returned as-is; deciding whether that is a failure belongs to
/// the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateStatement;

impl UpdateStatement {
    /// # Errors
    /// Returns `DataAccess` if stepping fails or the count does not fit `usize`.
    pub fn execute(
        &self,
        conn: &rusqlite::Connection,
        stmt: &mut Statement<'_>,
    ) -> Result<usize, SqlTemplateError> {
        ResultCursor::open(stmt).drain()?;
        usize::try_from(conn.changes()).map_err(|e| {
            SqlTemplateError::execution(format!("sqlite affected rows conversion error: {e}"))
        })
    }
}

impl<T: Send + 'static> StatementExecutor<T> for SingleResult {
    type Output = T;

    fn execute(
        &self,
        stmt: &mut Statement<'_>,
        mapper: &RowMapper<T>,
    ) -> Result<T, SqlTemplateError> {
        let mut cursor = ResultCursor::open(stmt);
        let Some(first) = cursor.next_row()? else {
            return Err(SqlTemplateError::NotFound);
        };
        // the extra row is only detected, never mapped
        if cursor.next_row()?.is_some() {
            return Err(SqlTemplateError::TooManyResults);
        }
        mapper.map_row(&first)
    }
}

impl<T: Send + 'static> StatementExecutor<T> for ManyResults {
    type Output = Vec<T>;

    fn execute(
        &self,
        stmt: &mut Statement<'_>,
        mapper: &RowMapper<T>,
    ) -> Result<Vec<T>, SqlTemplateError> {
        let mut cursor = ResultCursor::open(stmt);
        let mut out = Vec::new();
        while let Some(row) = cursor.next_row()? {
            out.push(mapper.map_row(&row)?);
        }
        Ok(out)
    }
}
