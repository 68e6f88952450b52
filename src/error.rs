use deadpool_sqlite::rusqlite;
use thiserror::Error;

/// Unified error type for every fallible operation in this crate.
///
/// Backend and pool errors convert in via `#[from]`; the string-carrying
/// variants cover setup and mapping failures that have no driver error
/// behind them.
#[derive(Debug, Error)]
pub enum RecordMapDbError {
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[error(transparent)]
    PoolErrorPostgres(#[from] deadpool::managed::PoolError<tokio_postgres::Error>),

    #[error(transparent)]
    PoolErrorSqlite(#[from] deadpool::managed::PoolError<rusqlite::Error>),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Record decode error: {0}")]
    DecodeError(String),

    /// A delete or select arrived with no usable predicates and the table
    /// was not opted in to full-table statements.
    #[error("{operation} on {table} has no predicates; enable full-table operations to run it")]
    FullTableDisabled {
        table: String,
        operation: &'static str,
    },

    #[error("Other database error: {0}")]
    Other(String),
}

impl From<deadpool_sqlite::InteractError> for RecordMapDbError {
    fn from(err: deadpool_sqlite::InteractError) -> Self {
        RecordMapDbError::Other(format!("SQLite interact error: {err}"))
    }
}
