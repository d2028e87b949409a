//! Error types for the Vaultproof core.

use thiserror::Error;

/// Core errors raised by entropy, proof and encoding operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("requested {requested} qubits, hardware provides {available}")]
    Capacity { requested: u32, available: u32 },

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("encoding error: {0}")]
    EncodingError(String),
}

/// Input rejected at the call boundary, before any expensive work.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("source vault identifier is empty")]
    EmptySourceVault,

    #[error("target vault identifier is empty")]
    EmptyTargetVault,

    #[error("invalid digest {0:?}: expected 64 hex characters")]
    InvalidDigest(String),

    #[error("timestamp must be positive, got {0}")]
    InvalidTimestamp(i64),

    #[error("qubit count must be at least 1")]
    ZeroQubits,

    #[error("measurement count must be at least 1")]
    ZeroMeasurements,

    #[error("recursion depth {requested} exceeds maximum of {max}")]
    DepthExceeded { requested: usize, max: usize },

    #[error("recursion depth must be at least 1")]
    ZeroDepth,

    #[error("{physical} physical qubits cannot encode a logical qubit (need {ratio})")]
    InsufficientQubits { physical: u32, ratio: u32 },

    #[error("window of {window_ms} ms around {timestamp} is out of range")]
    WindowOutOfRange { timestamp: i64, window_ms: u64 },
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
