//! Error types shared by the transaction manager, repositories and services

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The backend refused to open a transaction. The unit of work never ran.
    #[error("failed to begin transaction: {0}")]
    Begin(#[source] sqlx::Error),

    /// The unit of work succeeded but the commit did not.
    #[error("failed to commit transaction: {0}")]
    Commit(#[source] sqlx::Error),

    /// A repository was handed a transaction context created by a different
    /// transaction manager implementation.
    #[error("invalid transaction context")]
    InvalidTxContext,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for logging errors with context on their way up
pub trait LogErr<T, E> {
    /// Log the error at error level and hand the result back unchanged
    fn log_err(self, context: &str) -> std::result::Result<T, E>;
}

impl<T, E: std::fmt::Display> LogErr<T, E> for std::result::Result<T, E> {
    fn log_err(self, context: &str) -> std::result::Result<T, E> {
        self.inspect_err(|e| tracing::error!(error = %e, "{}", context))
    }
}
