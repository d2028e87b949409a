//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Metadata serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Receipt not found.
    #[error("receipt not found: {0}")]
    NotFound(String),

    /// A snapshot would move a chain record backwards.
    #[error("regressive snapshot for receipt {receipt_id}: {reason}")]
    Regression { receipt_id: String, reason: String },

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A lock holder panicked.
    #[error("store lock poisoned")]
    Poisoned,

    /// Blocking task failed to complete.
    #[error("blocking task failed: {0}")]
    Task(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
