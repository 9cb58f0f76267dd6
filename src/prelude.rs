//! Convenient imports for common functionality.
//!
//! ```rust
//! use sql_template::prelude::*;
//! ```

pub use crate::config::{ConfigAndPool, TemplateOptions, TemplateOptionsBuilder};
pub use crate::connection::{AsConnection, SqliteConnection, Transaction};
pub use crate::error::{DataAccessError, SqlTemplateError};
pub use crate::mapper::{Record, RowMapper};
pub use crate::results::Row;
pub use crate::template::{SqlTemplate, TemplateSession};
pub use crate::types::RowValues;
pub use crate::{record, sql_args};
