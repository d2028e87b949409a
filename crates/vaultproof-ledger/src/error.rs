//! Error types for the ledger module.

use thiserror::Error;

use vaultproof_core::{Chain, UnknownChain};

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Chain name outside the supported set.
    #[error("unknown chain: {0}")]
    UnknownChain(String),

    /// A chain client rejected a request.
    #[error("{chain} client error: {message}")]
    Chain { chain: Chain, message: String },

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] vaultproof_store::StoreError),

    /// Core validation or capacity error.
    #[error("core error: {0}")]
    Core(#[from] vaultproof_core::CoreError),

    /// A spawned chain task panicked or was cancelled.
    #[error("chain task failed: {0}")]
    Task(String),
}

impl From<UnknownChain> for LedgerError {
    fn from(err: UnknownChain) -> Self {
        Self::UnknownChain(err.0)
    }
}

impl From<vaultproof_core::ValidationError> for LedgerError {
    fn from(err: vaultproof_core::ValidationError) -> Self {
        Self::Core(err.into())
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
