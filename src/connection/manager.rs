use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::spawn_blocking;
use tracing::{trace, warn};

use crate::config::TemplateOptions;
use crate::error::SqlTemplateError;

/// A `rusqlite` connection shared with the blocking thread that drives it.
pub type SharedSqliteConnection = Arc<Mutex<rusqlite::Connection>>;

/// bb8 manager that opens `SQLite` connections on the blocking pool.
#[derive(Debug, Clone)]
pub struct SqliteManager {
    db_path: String,
    busy_timeout: Duration,
    journal_wal: bool,
}

impl SqliteManager {
    #[must_use]
    pub fn new(options: &TemplateOptions) -> Self {
        Self {
            db_path: options.db_path.clone(),
            busy_timeout: Duration::from_millis(options.busy_timeout_ms),
            journal_wal: options.journal_wal,
        }
    }
}

impl bb8::ManageConnection for SqliteManager {
    type Connection = SharedSqliteConnection;
    type Error = SqlTemplateError;

    async fn connect(&self) -> Result<Self::Connection, Self::Error> {
        let db_path = self.db_path.clone();
        let busy_timeout = self.busy_timeout;
        let journal_wal = self.journal_wal;
        let conn = spawn_blocking(move || -> Result<rusqlite::Connection, SqlTemplateError> {
            let conn = rusqlite::Connection::open(&db_path)?;
            conn.busy_timeout(busy_timeout)?;
            if journal_wal {
                conn.execute_batch("PRAGMA journal_mode = WAL;")?;
            }
            Ok(conn)
        })
        .await
        .map_err(|e| SqlTemplateError::connection(format!("sqlite connect join error: {e}")))??;
        trace!(db_path = %self.db_path, "opened sqlite connection");
        Ok(Arc::new(Mutex::new(conn)))
    }

    async fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        run_blocking(Arc::clone(conn), |guard| {
            guard.execute_batch("SELECT 1")?;
            Ok(())
        })
        .await
    }

    /// A connection still inside a transaction (or still locked by a blocking task)
    /// is evicted rather than handed to the next caller.
    fn has_broken(&self, conn: &mut Self::Connection) -> bool {
        let broken = !conn.try_lock().is_ok_and(|guard| guard.is_autocommit());
        if broken {
            warn!(db_path = %self.db_path, "evicting sqlite connection left inside a transaction");
        }
        broken
    }
}

/// Run synchronous `rusqlite` work for `conn` on tokio's blocking pool.
pub(crate) async fn run_blocking<F, R>(
    conn: SharedSqliteConnection,
    func: F,
) -> Result<R, SqlTemplateError>
where
    F: FnOnce(&mut rusqlite::Connection) -> Result<R, SqlTemplateError> + Send + 'static,
    R: Send + 'static,
{
    spawn_blocking(move || {
        let mut guard = conn.blocking_lock();
        func(&mut guard)
    })
    .await
    .map_err(|e| SqlTemplateError::execution(format!("sqlite spawn_blocking join error: {e}")))?
}

#[cfg(test)]
mod tests {
    use bb8::ManageConnection;

    use super::*;

    fn manager() -> SqliteManager {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manager.db");
        std::mem::forget(dir);
        SqliteManager::new(&TemplateOptions::new(path.to_string_lossy()))
    }

    #[tokio::test]
    async fn open_transaction_marks_connection_broken() {
        let manager = manager();
        let mut conn = manager.connect().await.unwrap();
        assert!(!manager.has_broken(&mut conn));

        conn.lock().await.execute_batch("BEGIN").unwrap();
        assert!(manager.has_broken(&mut conn));

        conn.lock().await.execute_batch("ROLLBACK").unwrap();
        assert!(!manager.has_broken(&mut conn));
    }

    #[tokio::test]
    async fn locked_connection_is_broken() {
        let manager = manager();
        let mut conn = manager.connect().await.unwrap();
        let held = Arc::clone(&conn);
        let _guard = held.lock().await;
        assert!(manager.has_broken(&mut conn));
    }
}
