//! Statement execution strategies.
//!
//! Everything here is synchronous and runs on the connection's blocking thread; the
//! template moves a [`BoundStatement`] and a mapper into that closure and gets back the
//! strategy's output.

mod strategy;

use crate::binder::BoundStatement;
use crate::error::SqlTemplateError;
use crate::mapper::RowMapper;

pub use strategy::{ManyResults, SingleResult, StatementExecutor, UpdateStatement};

/// Prepare `bound` on `conn` and run it through `strategy`.
///
/// # Errors
/// Returns the binder's `BindingError`, the strategy's errors, or `DataAccess` for
/// driver failures.
pub fn run_query<T, S>(
    conn: &rusqlite::Connection,
    bound: &BoundStatement,
    mapper: &RowMapper<T>,
    strategy: &S,
) -> Result<S::Output, SqlTemplateError>
where
    S: StatementExecutor<T>,
{
    let mut stmt = bound.prepare(conn)?;
    strategy.execute(&mut stmt, mapper)
}

/// Run a mutation through [`UpdateStatement`] and return the affected-row count.
///
/// # Errors
/// Returns the binder's `BindingError` or `DataAccess` for driver failures.
pub fn execute_update(
    conn: &rusqlite::Connection,
    bound: &BoundStatement,
) -> Result<usize, SqlTemplateError> {
    let mut stmt = bound.prepare(conn)?;
    UpdateStatement.execute(conn, &mut stmt)
}
