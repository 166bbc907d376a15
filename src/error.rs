//! Error types for the statement builder.

use thiserror::Error;

/// Result type alias for builder and storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by [`StatementBuilder`](crate::StatementBuilder) and its storage.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid database/table settings, or an unknown table.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed arguments passed to a fragment or execution operation.
    #[error("Argument error: {0}")]
    Argument(String),

    /// Failure reported by SQLite.
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn argument(message: impl Into<String>) -> Self {
        Self::Argument(message.into())
    }

    /// Check if this is a configuration error
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Check if this is an argument error
    pub fn is_argument(&self) -> bool {
        matches!(self, Self::Argument(_))
    }

    /// Check if this error came from the storage backend
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}
