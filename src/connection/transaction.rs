use tracing::{debug, warn};

use crate::error::SqlTemplateError;

use super::pooled::SqliteConnection;

/// Transaction handle that owns the `SQLite` connection until completion.
///
/// Statements join the transaction by running through
/// [`SqlTemplate::on`](crate::SqlTemplate::on) with this handle. Dropping it without
/// `commit` or `rollback` rolls back.
#[derive(Debug)]
pub struct Transaction {
    conn: Option<SqliteConnection>,
}

impl Transaction {
    /// Begin a transaction, consuming the connection until commit/rollback.
    ///
    /// # Errors
    /// Returns `SqlTemplateError` if `BEGIN` fails or a transaction is already open.
    pub async fn begin(mut conn: SqliteConnection) -> Result<Self, SqlTemplateError> {
        conn.begin().await?;
        debug!("transaction started");
        Ok(Self { conn: Some(conn) })
    }

    /// Commit and hand the connection back to the caller.
    ///
    /// A failed commit is followed by a rollback attempt before the error is returned.
    ///
    /// # Errors
    /// Returns `SqlTemplateError` if committing fails.
    pub async fn commit(mut self) -> Result<SqliteConnection, SqlTemplateError> {
        let mut conn = self.take_conn()?;
        if let Err(err) = conn.commit().await {
            if let Err(rollback_err) = conn.rollback().await {
                warn!(error = %rollback_err, "rollback after failed commit also failed; connection will be evicted");
            }
            return Err(err);
        }
        debug!("transaction committed");
        Ok(conn)
    }

    /// Roll back and hand the connection back to the caller.
    ///
    /// # Errors
    /// Returns `SqlTemplateError` if rolling back fails.
    pub async fn rollback(mut self) -> Result<SqliteConnection, SqlTemplateError> {
        let mut conn = self.take_conn()?;
        conn.rollback().await?;
        debug!("transaction rolled back");
        Ok(conn)
    }

    pub(crate) fn conn_mut(&mut self) -> Result<&mut SqliteConnection, SqlTemplateError> {
        self.conn
            .as_mut()
            .ok_or_else(|| SqlTemplateError::execution("SQLite transaction already completed"))
    }

    fn take_conn(&mut self) -> Result<SqliteConnection, SqlTemplateError> {
        self.conn
            .take()
            .ok_or_else(|| SqlTemplateError::execution("SQLite transaction already completed"))
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        let Some(mut conn) = self.conn.take() else {
            return;
        };
        if !conn.in_transaction() {
            return;
        }
        debug!("rolling back abandoned transaction");
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(err) = conn.rollback().await {
                    warn!(error = %err, "rollback of abandoned transaction failed; connection will be evicted");
                }
            });
        } else {
            conn.rollback_now();
        }
    }
}
