//! # Vaultproof Core
//!
//! Pure primitives for Vaultproof: entropy, transfer proofs, Merkle
//! commitments and the records that describe anchored roots.
//!
//! This crate contains no I/O, no storage, no networking. It is pure computation
//! over hash-committed data structures.
//!
//! ## Key Types
//!
//! - [`EntropySource`] - Simulated quantum randomness with a fidelity tag
//! - [`ZkProof`] - Attestation of a transfer between two vaults
//! - [`ProofConstructor`] - Generates, verifies, aggregates and chains proofs
//! - [`MerkleTree`] - Commitment over ordered proof hashes
//! - [`PublishReceipt`] - A Merkle root anchored on every configured chain
//!
//! ## Canonicalization
//!
//! Proof ids and hashes are computed over deterministic CBOR. See the
//! [`canonical`] module.

pub mod anchor;
pub mod canonical;
pub mod crypto;
pub mod entropy;
pub mod error;
pub mod merkle;
pub mod proof;
pub mod types;
pub mod validation;

pub use anchor::{Chain, ChainRecord, ChainStatus, PublishMetadata, PublishReceipt, UnknownChain};
pub use canonical::{canonical_params_bytes, canonical_proof_bytes};
pub use crypto::{domain, Digest};
pub use entropy::{
    apply_error_correction, estimate_logical_error_rate, meets_target, specs, DataInput,
    EntropyRecord, EntropySource, ErrorCorrection, FidelityMetrics, QuantumSpecs,
    QuantumValidation,
};
pub use error::{CoreError, Result, ValidationError};
pub use merkle::{
    expected_path_len, merkle_root, verify_merkle_inclusion, verify_merkle_proof,
    verify_merkle_proof_hex, MerkleTree,
};
pub use proof::{
    AggregatedProof, Curve, PerformanceMetrics, ProofConstructor, ProofPayload, ProofProtocol,
    ProofVerification, ProvingBackend, RecursiveProof, SimulatedGroth16, VerificationFailure,
    ZkProof, ZkProofParams, MAX_RECURSIVE_DEPTH,
};
pub use types::{now_millis, ReceiptId};
pub use validation::validate_params;
