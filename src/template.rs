//! The template façade.
//!
//! [`SqlTemplate`] is what DAO code talks to. Each operation binds its arguments,
//! obtains a connection according to a [`ConnectionHandle`], runs one statement
//! through an execution strategy, maps the rows, and releases the connection if it
//! acquired it. [`TemplateSession`] offers the same operations on a connection or
//! transaction the caller owns.

use std::sync::Arc;

use tracing::{debug, error};

use crate::binder::{BoundStatement, bind};
use crate::config::{ConfigAndPool, TemplateOptions};
use crate::connection::{
    AsConnection, ConnectionHandle, ConnectionScope, PoolStats, PoolStatsSnapshot,
    SqliteConnection, SqliteManager, Transaction,
};
use crate::error::SqlTemplateError;
use crate::executor::{self, ManyResults, SingleResult, StatementExecutor};
use crate::mapper::{MapperCache, Record, RowMapper};
use crate::types::RowValues;

/// Entry point for parameterized statements against a pooled `SQLite` database.
///
/// Cloning is cheap; clones share the pool, the mapper cache and the statistics.
///
/// ```rust,no_run
/// use sql_template::prelude::*;
///
/// sql_template::record! {
///     #[derive(Debug)]
///     pub struct User {
///         pub id: i64,
///         pub account: String,
///     }
/// }
///
/// # async fn demo() -> Result<(), SqlTemplateError> {
/// let template = SqlTemplate::connect(TemplateOptions::new("users.db")).await?;
/// template
///     .execute("insert into users (account) values (?)", &sql_args!["gugu"])
///     .await?;
/// let user: User = template
///     .query_for_object("select id, account from users where account = ?", &sql_args!["gugu"])
///     .await?;
/// # let _ = user;
/// # Ok(()) }
/// ```
#[derive(Clone, Debug)]
pub struct SqlTemplate {
    config: ConfigAndPool,
    mappers: Arc<MapperCache>,
    stats: Arc<PoolStats>,
}

impl SqlTemplate {
    #[must_use]
    pub fn new(config: ConfigAndPool) -> Self {
        Self {
            config,
            mappers: Arc::new(MapperCache::new()),
            stats: Arc::new(PoolStats::default()),
        }
    }

    /// Build the pool from `options` and wrap it.
    ///
    /// # Errors
    /// Returns `ConfigError` or `DataAccess` from pool construction.
    pub async fn connect(options: TemplateOptions) -> Result<Self, SqlTemplateError> {
        Ok(Self::new(ConfigAndPool::new_sqlite(options).await?))
    }

    /// The underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &bb8::Pool<SqliteManager> {
        &self.config.pool
    }

    #[must_use]
    pub fn config(&self) -> &ConfigAndPool {
        &self.config
    }

    /// Acquire/release counters for connections the template checked out itself.
    #[must_use]
    pub fn pool_stats(&self) -> PoolStatsSnapshot {
        self.stats.snapshot()
    }

    /// The cached derived mapper for `T`, for reuse with the `*_with` operations.
    ///
    /// # Errors
    /// Returns `MappingError` if `T`'s descriptor is invalid.
    pub fn mapper_for<T: Record>(&self) -> Result<RowMapper<T>, SqlTemplateError> {
        self.mappers.get_or_derive::<T>()
    }

    /// Check out a connection the caller owns until it is dropped.
    ///
    /// # Errors
    /// Returns `DataAccess` if the pool cannot provide a connection.
    pub async fn get_connection(&self) -> Result<SqliteConnection, SqlTemplateError> {
        self.config.get_connection().await
    }

    /// Check out a connection and begin a transaction on it.
    ///
    /// # Errors
    /// Returns `DataAccess` if checkout or `BEGIN` fails.
    pub async fn begin(&self) -> Result<Transaction, SqlTemplateError> {
        Transaction::begin(self.get_connection().await?).await
    }

    /// Run the template's operations on a caller-owned connection or transaction.
    pub fn on<'t, 'c, C>(&'t self, conn: &'c mut C) -> TemplateSession<'t, 'c, C>
    where
        C: AsConnection + ?Sized,
    {
        TemplateSession {
            template: self,
            conn,
        }
    }

    /// Run a mutation and return the affected-row count.
    ///
    /// # Errors
    /// `BindingError` before anything reaches the database, otherwise `DataAccess`.
    pub async fn execute(&self, sql: &str, args: &[RowValues]) -> Result<usize, SqlTemplateError> {
        let bound = bind_logged(sql, args)?;
        self.run_update(ConnectionHandle::Acquire, bound).await
    }

    /// Alias of [`execute`](Self::execute).
    ///
    /// # Errors
    /// Same as [`execute`](Self::execute).
    pub async fn update(&self, sql: &str, args: &[RowValues]) -> Result<usize, SqlTemplateError> {
        self.execute(sql, args).await
    }

    /// Fetch exactly one row mapped into `T` through its derived mapper.
    ///
    /// # Errors
    /// `NotFound` for zero rows, `TooManyResults` for more than one, plus binding,
    /// mapping and data-access errors.
    pub async fn query_for_object<T: Record>(
        &self,
        sql: &str,
        args: &[RowValues],
    ) -> Result<T, SqlTemplateError> {
        let bound = bind_logged(sql, args)?;
        let mapper = self.mappers.get_or_derive::<T>()?;
        self.run_query(ConnectionHandle::Acquire, bound, mapper, SingleResult)
            .await
    }

    /// Fetch exactly one row mapped by `mapper`.
    ///
    /// # Errors
    /// Same as [`query_for_object`](Self::query_for_object).
    pub async fn query_for_object_with<T: Send + 'static>(
        &self,
        sql: &str,
        mapper: &RowMapper<T>,
        args: &[RowValues],
    ) -> Result<T, SqlTemplateError> {
        let bound = bind_logged(sql, args)?;
        self.run_query(ConnectionHandle::Acquire, bound, mapper.clone(), SingleResult)
            .await
    }

    /// Fetch every row mapped into `T`, in result order. No rows is an empty `Vec`.
    ///
    /// # Errors
    /// Binding, mapping and data-access errors.
    pub async fn query<T: Record>(
        &self,
        sql: &str,
        args: &[RowValues],
    ) -> Result<Vec<T>, SqlTemplateError> {
        let bound = bind_logged(sql, args)?;
        let mapper = self.mappers.get_or_derive::<T>()?;
        self.run_query(ConnectionHandle::Acquire, bound, mapper, ManyResults)
            .await
    }

    /// Fetch every row mapped by `mapper`, in result order.
    ///
    /// # Errors
    /// Same as [`query`](Self::query).
    pub async fn query_with<T: Send + 'static>(
        &self,
        sql: &str,
        mapper: &RowMapper<T>,
        args: &[RowValues],
    ) -> Result<Vec<T>, SqlTemplateError> {
        let bound = bind_logged(sql, args)?;
        self.run_query(ConnectionHandle::Acquire, bound, mapper.clone(), ManyResults)
            .await
    }

    async fn run_update(
        &self,
        handle: ConnectionHandle<'_>,
        bound: BoundStatement,
    ) -> Result<usize, SqlTemplateError> {
        debug!(sql = %bound.sql(), params = bound.values().len(), "executing update");
        let sql = bound.sql().to_owned();
        let scope = ConnectionScope::open(&self.config, &self.stats, handle).await?;
        let result = scope
            .connection()?
            .run(move |conn| executor::execute_update(conn, &bound))
            .await;
        drop(scope);
        result.inspect_err(|err| log_failure(&sql, err))
    }

    async fn run_query<T, S>(
        &self,
        handle: ConnectionHandle<'_>,
        bound: BoundStatement,
        mapper: RowMapper<T>,
        strategy: S,
    ) -> Result<S::Output, SqlTemplateError>
    where
        T: Send + 'static,
        S: StatementExecutor<T>,
    {
        debug!(sql = %bound.sql(), params = bound.values().len(), "executing query");
        let sql = bound.sql().to_owned();
        let scope = ConnectionScope::open(&self.config, &self.stats, handle).await?;
        let result = scope
            .connection()?
            .run(move |conn| executor::run_query(conn, &bound, &mapper, &strategy))
            .await;
        drop(scope);
        result.inspect_err(|err| log_failure(&sql, err))
    }
}

/// Template operations bound to a caller-owned connection or transaction.
///
/// Statements share the caller's connection, so they all fall inside whatever
/// transaction it has open. The connection is never released here.
pub struct TemplateSession<'t, 'c, C: AsConnection + ?Sized> {
    template: &'t SqlTemplate,
    conn: &'c mut C,
}

impl<C: AsConnection + ?Sized> TemplateSession<'_, '_, C> {
    /// # Errors
    /// Same as [`SqlTemplate::execute`].
    pub async fn execute(&mut self, sql: &str, args: &[RowValues]) -> Result<usize, SqlTemplateError> {
        let bound = bind_logged(sql, args)?;
        let conn = self.conn.as_connection()?;
        self.template
            .run_update(ConnectionHandle::Supplied(conn), bound)
            .await
    }

    /// # Errors
    /// Same as [`SqlTemplate::execute`].
    pub async fn update(&mut self, sql: &str, args: &[RowValues]) -> Result<usize, SqlTemplateError> {
        self.execute(sql, args).await
    }

    /// # Errors
    /// Same as [`SqlTemplate::query_for_object`].
    pub async fn query_for_object<T: Record>(
        &mut self,
        sql: &str,
        args: &[RowValues],
    ) -> Result<T, SqlTemplateError> {
        let bound = bind_logged(sql, args)?;
        let mapper = self.template.mappers.get_or_derive::<T>()?;
        let conn = self.conn.as_connection()?;
        self.template
            .run_query(ConnectionHandle::Supplied(conn), bound, mapper, SingleResult)
            .await
    }

    /// # Errors
    /// Same as [`SqlTemplate::query_for_object`].
    pub async fn query_for_object_with<T: Send + 'static>(
        &mut self,
        sql: &str,
        mapper: &RowMapper<T>,
        args: &[RowValues],
    ) -> Result<T, SqlTemplateError> {
        let bound = bind_logged(sql, args)?;
        let conn = self.conn.as_connection()?;
        self.template
            .run_query(ConnectionHandle::Supplied(conn), bound, mapper.clone(), SingleResult)
            .await
    }

    /// # Errors
    /// Same as [`SqlTemplate::query`].
    pub async fn query<T: Record>(
        &mut self,
        sql: &str,
        args: &[RowValues],
    ) -> Result<Vec<T>, SqlTemplateError> {
        let bound = bind_logged(sql, args)?;
        let mapper = self.template.mappers.get_or_derive::<T>()?;
        let conn = self.conn.as_connection()?;
        self.template
            .run_query(ConnectionHandle::Supplied(conn), bound, mapper, ManyResults)
            .await
    }

    /// # Errors
    /// Same as [`SqlTemplate::query`].
    pub async fn query_with<T: Send + 'static>(
        &mut self,
        sql: &str,
        mapper: &RowMapper<T>,
        args: &[RowValues],
    ) -> Result<Vec<T>, SqlTemplateError> {
        let bound = bind_logged(sql, args)?;
        let conn = self.conn.as_connection()?;
        self.template
            .run_query(ConnectionHandle::Supplied(conn), bound, mapper.clone(), ManyResults)
            .await
    }
}

fn bind_logged(sql: &str, args: &[RowValues]) -> Result<BoundStatement, SqlTemplateError> {
    bind(sql, args).inspect_err(|err| log_failure(sql, err))
}

fn log_failure(sql: &str, err: &SqlTemplateError) {
    match err {
        SqlTemplateError::DataAccess(_) => error!(sql = %sql, error = %err, "statement failed"),
        _ => debug!(sql = %sql, error = %err, "statement failed"),
    }
}
