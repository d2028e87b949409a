//! # VaultProof
//!
//! Attests transfers between isolated vaults, commits batches of attestations
//! under a Merkle root and anchors that root on three chains.
//!
//! ## Overview
//!
//! - **Entropy**: a simulated quantum source supplies randomness and a
//!   fidelity score folded into every proof
//! - **Proofs**: transfer attestations that verify an order of magnitude
//!   faster than they generate, with Merkle aggregation and recursion
//! - **Ledger**: concurrent publishing to Ethereum, Polygon and Solana with
//!   bounded confirmation waits
//! - **Dashboard**: pipeline events feed a scheduler that exports snapshots
//!   to configured endpoints
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vaultproof::{Pipeline, LedgerConfig};
//! use vaultproof::core::{Digest, ZkProofParams};
//!
//! async fn example() {
//!     let pipeline = Pipeline::in_memory(LedgerConfig::from_env());
//!
//!     let params = (0u8..5)
//!         .map(|i| ZkProofParams::new("vault-a", "vault-b", Digest::hash(&[i]), 1_700_000_000_000))
//!         .collect();
//!     let batch = pipeline.anchor_batch(params).await.unwrap();
//!
//!     let confirmed = pipeline
//!         .wait_for_confirmation(&batch.receipt.receipt_id, 3)
//!         .await;
//!     assert!(pipeline.verify_inclusion(&batch.aggregated, 0));
//!     println!("confirmed: {confirmed}");
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `vaultproof::core` - Entropy, proofs, Merkle trees and chain records
//! - `vaultproof::store` - Receipt storage
//! - `vaultproof::ledger` - Multi-chain synchronizer

pub mod error;
pub mod events;
pub mod export;
pub mod pipeline;
pub mod scheduler;

// Re-export component crates
pub use vaultproof_core as core;
pub use vaultproof_ledger as ledger;
pub use vaultproof_store as store;

pub use error::{PipelineError, Result};
pub use events::{
    Dashboard, EventGraph, GraphNode, NodeKind, PipelineEvent, ProofSummary, PublishSummary,
};
pub use export::{
    propagate, EndpointOutcome, ExportConfig, ExportError, ExportPayload, ExportSink, MemorySink,
    PropagationReport,
};
pub use pipeline::{AnchoredBatch, Pipeline, PipelineConfig};
pub use scheduler::{Scheduler, SchedulerConfig};

pub use vaultproof_ledger::{LedgerConfig, LedgerSynchronizer};
