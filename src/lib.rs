//! A small template layer over `rusqlite`.
//!
//! [`SqlTemplate`] runs one parameterized statement per call: arguments are bound by
//! position, a connection is checked out of a bb8 pool (or borrowed from the caller),
//! and result rows are mapped into typed records declared with [`record!`]. Run the
//! same operations inside a transaction through [`SqlTemplate::on`].

pub mod binder;
pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod mapper;
pub mod prelude;
pub mod results;
pub mod template;
pub mod types;

pub use binder::{BoundStatement, bind};
pub use config::{ConfigAndPool, TemplateOptions, TemplateOptionsBuilder};
pub use connection::{
    AsConnection, ConnectionHandle, PoolStatsSnapshot, SqliteConnection, SqliteManager,
    Transaction,
};
pub use error::{DataAccessError, SqlTemplateError};
pub use executor::{ManyResults, SingleResult, StatementExecutor, UpdateStatement};
pub use mapper::{FieldValue, MapperCache, Record, RowMapper};
pub use results::Row;
pub use template::{SqlTemplate, TemplateSession};
pub use types::RowValues;
