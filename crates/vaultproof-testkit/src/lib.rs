//! # VaultProof Testkit
//!
//! Testing utilities for VaultProof.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Canonical encodings and Merkle shapes with expected outputs
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Helper structs for setting up proofs, ledgers and pipelines
//!
//! ## Golden Vectors
//!
//! ```rust
//! use vaultproof_testkit::vectors::verify_all_vectors;
//!
//! for report in verify_all_vectors() {
//!     println!("{}: {} ({})", report.name, report.matches, report.actual);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use vaultproof_core::canonical_params_bytes;
//! use vaultproof_testkit::generators::{params_from_input, ProofParamsInput};
//!
//! proptest! {
//!     #[test]
//!     fn encoding_is_deterministic(input: ProofParamsInput) {
//!         let p = params_from_input(&input);
//!         prop_assert_eq!(canonical_params_bytes(&p), canonical_params_bytes(&p));
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use vaultproof_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let proofs = fixture.make_proofs(4);
//! let aggregated = fixture.constructor.aggregate_proofs(proofs);
//! assert_eq!(aggregated.proofs.len(), 4);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_vault_fixtures, simulated_chains, TestFixture};
pub use generators::{params_from_input, proof_from_input, ProofParamsInput};
pub use vectors::{
    merkle_vectors, params_vectors, verify_all_vectors, vectors_json, MerkleVector, ParamsVector,
    VectorReport,
};
