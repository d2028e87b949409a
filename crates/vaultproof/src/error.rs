//! Error types for the pipeline.

use thiserror::Error;

use vaultproof_core::{CoreError, ValidationError};
use vaultproof_ledger::LedgerError;
use vaultproof_store::StoreError;

use crate::export::ExportError;

/// Errors that can occur during pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Entropy or proof construction failed.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Validation error.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Publishing or synchronization failed.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Dashboard export failed.
    #[error("export error: {0}")]
    Export(#[from] ExportError),

    /// The scheduler could not be started or stopped.
    #[error("scheduler error: {0}")]
    Scheduler(String),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
