//! Connection lifecycle: the bb8 manager, pooled connections, per-call scopes and
//! caller-owned transactions.

mod manager;
mod pooled;
mod scope;
mod transaction;

pub use manager::{SharedSqliteConnection, SqliteManager};
pub use pooled::SqliteConnection;
pub(crate) use scope::ConnectionScope;
pub use scope::{ConnectionHandle, PoolStats, PoolStatsSnapshot};
pub use transaction::Transaction;

use crate::error::SqlTemplateError;

/// Anything that can lend a connection to [`SqlTemplate::on`](crate::SqlTemplate::on).
pub trait AsConnection {
    /// # Errors
    /// Returns `SqlTemplateError::DataAccess` if the connection is no longer usable.
    fn as_connection(&mut self) -> Result<&mut SqliteConnection, SqlTemplateError>;
}

impl AsConnection for SqliteConnection {
    fn as_connection(&mut self) -> Result<&mut SqliteConnection, SqlTemplateError> {
        Ok(self)
    }
}

impl AsConnection for Transaction {
    fn as_connection(&mut self) -> Result<&mut SqliteConnection, SqlTemplateError> {
        self.conn_mut()
    }
}
