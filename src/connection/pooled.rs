use std::fmt;
use std::sync::Arc;

use bb8::PooledConnection;
use tracing::warn;

use crate::error::SqlTemplateError;

use super::manager::{SharedSqliteConnection, SqliteManager, run_blocking};

/// Connection wrapper backed by a bb8 pooled `SQLite` connection.
///
/// Returned to the pool when dropped, unless it is still inside a transaction, in
/// which case the pool discards it.
pub struct SqliteConnection {
    conn: PooledConnection<'static, SqliteManager>,
    in_transaction: bool,
}

impl SqliteConnection {
    pub(crate) fn new(conn: PooledConnection<'static, SqliteManager>) -> Self {
        Self {
            conn,
            in_transaction: false,
        }
    }

    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Execute a batch of statements without parameters, e.g. schema setup.
    ///
    /// Outside a transaction the batch is wrapped in its own transaction so a failing
    /// statement leaves nothing half-applied.
    ///
    /// # Errors
    /// Returns `SqlTemplateError::DataAccess` if any statement fails.
    pub async fn execute_batch(&mut self, sql: &str) -> Result<(), SqlTemplateError> {
        let sql_owned = sql.to_owned();
        let in_transaction = self.in_transaction;
        self.run(move |guard| {
            if in_transaction {
                guard.execute_batch(&sql_owned)?;
            } else {
                let tx = guard.transaction()?;
                tx.execute_batch(&sql_owned)?;
                tx.commit()?;
            }
            Ok(())
        })
        .await
    }

    /// Run synchronous `rusqlite` logic against the underlying pooled connection.
    ///
    /// # Errors
    /// Returns whatever `func` returns, or `DataAccess` if the blocking task fails.
    pub async fn with_connection<F, R>(&self, func: F) -> Result<R, SqlTemplateError>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<R, SqlTemplateError> + Send + 'static,
        R: Send + 'static,
    {
        self.run(func).await
    }

    pub(crate) async fn run<F, R>(&self, func: F) -> Result<R, SqlTemplateError>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<R, SqlTemplateError> + Send + 'static,
        R: Send + 'static,
    {
        run_blocking(self.handle(), func).await
    }

    pub(crate) async fn begin(&mut self) -> Result<(), SqlTemplateError> {
        if self.in_transaction {
            return Err(SqlTemplateError::execution(
                "SQLite transaction already in progress",
            ));
        }
        self.run(|guard| {
            guard.execute_batch("BEGIN")?;
            Ok(())
        })
        .await?;
        self.in_transaction = true;
        Ok(())
    }

    pub(crate) async fn commit(&mut self) -> Result<(), SqlTemplateError> {
        self.finish("COMMIT").await
    }

    pub(crate) async fn rollback(&mut self) -> Result<(), SqlTemplateError> {
        self.finish("ROLLBACK").await
    }

    /// Synchronous rollback for drop paths outside a runtime. Skipped if the
    /// connection is still locked by a blocking task.
    pub(crate) fn rollback_now(&mut self) {
        if !self.in_transaction {
            return;
        }
        match self.conn.try_lock() {
            Ok(guard) => {
                match guard.execute_batch("ROLLBACK") {
                    Ok(()) => self.in_transaction = false,
                    Err(err) => warn!(
                        error = %err,
                        "rollback of abandoned transaction failed; connection will be evicted"
                    ),
                }
            }
            Err(_) => warn!("connection busy; abandoned transaction will be evicted with it"),
        }
    }

    async fn finish(&mut self, verb: &'static str) -> Result<(), SqlTemplateError> {
        if !self.in_transaction {
            return Err(SqlTemplateError::execution("SQLite transaction not active"));
        }
        self.run(move |guard| {
            guard.execute_batch(verb)?;
            Ok(())
        })
        .await?;
        self.in_transaction = false;
        Ok(())
    }

    fn handle(&self) -> SharedSqliteConnection {
        Arc::clone(&*self.conn)
    }
}

impl fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("in_transaction", &self.in_transaction)
            .finish()
    }
}
