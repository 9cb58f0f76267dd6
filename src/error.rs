use thiserror::Error;

/// Errors surfaced by every template operation.
///
/// Driver and pool failures never leak as raw driver types; they arrive wrapped in
/// [`SqlTemplateError::DataAccess`].
#[derive(Debug, Error)]
pub enum SqlTemplateError {
    #[error("Parameter binding error: {0}")]
    BindingError(String),

    #[error("Row mapping error: {0}")]
    MappingError(String),

    #[error("Query returned no rows where exactly one was expected")]
    NotFound,

    #[error("Query returned more than one row where exactly one was expected")]
    TooManyResults,

    #[error(transparent)]
    DataAccess(#[from] DataAccessError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Driver-level failures, re-wrapped at the executor and connection boundaries.
#[derive(Debug, Error)]
pub enum DataAccessError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("SQL execution error: {0}")]
    Execution(String),
}

impl SqlTemplateError {
    /// True when a single-result query found nothing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    #[must_use]
    pub fn is_data_access(&self) -> bool {
        matches!(self, Self::DataAccess(_))
    }

    pub(crate) fn connection(message: impl Into<String>) -> Self {
        Self::DataAccess(DataAccessError::Connection(message.into()))
    }

    pub(crate) fn execution(message: impl Into<String>) -> Self {
        Self::DataAccess(DataAccessError::Execution(message.into()))
    }
}

impl From<rusqlite::Error> for SqlTemplateError {
    fn from(err: rusqlite::Error) -> Self {
        SqlTemplateError::DataAccess(DataAccessError::Sqlite(err))
    }
}

impl From<bb8::RunError<SqlTemplateError>> for SqlTemplateError {
    fn from(err: bb8::RunError<SqlTemplateError>) -> Self {
        match err {
            bb8::RunError::User(inner) => inner,
            bb8::RunError::TimedOut => {
                SqlTemplateError::connection("SQLite pool checkout timed out")
            }
        }
    }
}
