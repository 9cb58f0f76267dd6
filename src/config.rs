use std::time::Duration;

use bb8::Pool;
use serde::Deserialize;

use crate::connection::{SqliteConnection, SqliteManager};
use crate::error::SqlTemplateError;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_CONNECTION_TIMEOUT_MS: u64 = 30_000;

/// Options for configuring the `SQLite` pool behind a template.
///
/// Deserializable so applications can keep them in their own config files; missing
/// keys fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TemplateOptions {
    pub db_path: String,
    pub max_connections: u32,
    pub busy_timeout_ms: u64,
    pub connection_timeout_ms: u64,
    pub journal_wal: bool,
}

impl Default for TemplateOptions {
    fn default() -> Self {
        Self {
            db_path: String::new(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            connection_timeout_ms: DEFAULT_CONNECTION_TIMEOUT_MS,
            journal_wal: true,
        }
    }
}

impl TemplateOptions {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Self::default()
        }
    }

    /// # Errors
    /// Returns `SqlTemplateError::ConfigError` for an empty path or a zero-sized pool.
    pub fn validate(&self) -> Result<(), SqlTemplateError> {
        if self.db_path.trim().is_empty() {
            return Err(SqlTemplateError::ConfigError(
                "db_path must not be empty".into(),
            ));
        }
        if self.max_connections == 0 {
            return Err(SqlTemplateError::ConfigError(
                "max_connections must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Fluent builder for [`TemplateOptions`].
#[derive(Debug, Clone)]
pub struct TemplateOptionsBuilder {
    opts: TemplateOptions,
}

impl TemplateOptionsBuilder {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            opts: TemplateOptions::new(db_path),
        }
    }

    #[must_use]
    pub fn max_connections(mut self, max_connections: u32) -> Self {
        self.opts.max_connections = max_connections;
        self
    }

    #[must_use]
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.opts.busy_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.opts.connection_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn journal_wal(mut self, enabled: bool) -> Self {
        self.opts.journal_wal = enabled;
        self
    }

    #[must_use]
    pub fn finish(self) -> TemplateOptions {
        self.opts
    }

    /// Build a `ConfigAndPool` for `SQLite`.
    ///
    /// # Errors
    ///
    /// Returns `SqlTemplateError` if validation, pool creation, or the initial smoke
    /// test fails.
    pub async fn build(self) -> Result<ConfigAndPool, SqlTemplateError> {
        ConfigAndPool::new_sqlite(self.finish()).await
    }
}

/// Configuration and connection pool for a database
#[derive(Clone)]
pub struct ConfigAndPool {
    /// The connection pool
    pub pool: Pool<SqliteManager>,
    /// The options the pool was built from
    pub options: TemplateOptions,
}

impl std::fmt::Debug for ConfigAndPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.pool.state();
        f.debug_struct("ConfigAndPool")
            .field("options", &self.options)
            .field("connections", &state.connections)
            .field("idle_connections", &state.idle_connections)
            .finish()
    }
}

impl ConfigAndPool {
    #[must_use]
    pub fn sqlite_builder(db_path: impl Into<String>) -> TemplateOptionsBuilder {
        TemplateOptionsBuilder::new(db_path)
    }

    /// Create the bb8 pool and check out one connection to surface bad paths early.
    ///
    /// # Errors
    /// Returns `ConfigError` for invalid options or `DataAccess` if the first
    /// connection cannot be opened.
    pub async fn new_sqlite(options: TemplateOptions) -> Result<Self, SqlTemplateError> {
        options.validate()?;
        let manager = SqliteManager::new(&options);
        let pool = Pool::builder()
            .max_size(options.max_connections)
            .connection_timeout(Duration::from_millis(options.connection_timeout_ms))
            .build(manager)
            .await?;

        {
            let _smoke = pool.get().await?;
        }

        Ok(Self { pool, options })
    }

    /// Check a connection out of the pool. It returns to the pool when dropped.
    ///
    /// # Errors
    /// Returns `SqlTemplateError::DataAccess` if the pool cannot provide a connection.
    pub async fn get_connection(&self) -> Result<SqliteConnection, SqlTemplateError> {
        let conn = self.pool.get_owned().await?;
        Ok(SqliteConnection::new(conn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_path_is_rejected() {
        let err = TemplateOptions::default().validate().unwrap_err();
        assert!(matches!(err, SqlTemplateError::ConfigError(_)));
    }

    #[test]
    fn builder_sets_fields() {
        let opts = TemplateOptionsBuilder::new("app.db")
            .max_connections(2)
            .busy_timeout(Duration::from_secs(1))
            .journal_wal(false)
            .finish();
        assert_eq!(opts.max_connections, 2);
        assert_eq!(opts.busy_timeout_ms, 1_000);
        assert!(!opts.journal_wal);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn deserializes_with_defaults() {
        let opts: TemplateOptions =
            serde_json::from_str(r#"{ "db_path": "users.db", "max_connections": 4 }"#).unwrap();
        assert_eq!(opts.db_path, "users.db");
        assert_eq!(opts.max_connections, 4);
        assert_eq!(opts.busy_timeout_ms, DEFAULT_BUSY_TIMEOUT_MS);
        assert!(opts.journal_wal);
    }

    #[tokio::test]
    async fn zero_pool_size_fails_before_connecting() {
        let err = ConfigAndPool::sqlite_builder("never-created.db")
            .max_connections(0)
            .build()
            .await
            .unwrap_err();
        assert!(matches!(err, SqlTemplateError::ConfigError(_)));
    }
}
