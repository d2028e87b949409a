//! # VaultProof Ledger
//!
//! Publishes Merkle roots to Ethereum, Polygon and Solana and reads them back
//! as a single ledger.
//!
//! ## Overview
//!
//! [`LedgerSynchronizer`] is the context object. It owns one [`ChainClient`]
//! per chain and persists every [`PublishReceipt`] through a
//! [`ReceiptStore`]. The bundled [`SimulatedChain`] mines blocks on the tokio
//! clock at each chain's real block time.
//!
//! ## Key Properties
//!
//! - **Concurrent fan-out**: submissions and reads hit every chain at once
//! - **Partial failure tolerated**: a rejecting chain yields a `Failed` record
//! - **Monotonic progress**: confirmations and status never move backwards
//! - **Bounded waits**: confirmation polling always ends at the timeout
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vaultproof_core::{Digest, PublishMetadata};
//! use vaultproof_ledger::{LedgerConfig, LedgerSynchronizer};
//! use vaultproof_store::MemoryStore;
//!
//! async fn example() {
//!     let sync = LedgerSynchronizer::new(LedgerConfig::from_env(), Arc::new(MemoryStore::new()));
//!
//!     let receipt = sync
//!         .publish_merkle_root(Digest::hash(b"root"), PublishMetadata::new())
//!         .await
//!         .unwrap();
//!
//!     let confirmed = sync.wait_for_confirmation(&receipt.receipt_id, 3).await;
//!     println!("confirmed: {confirmed}");
//! }
//! ```
//!
//! [`PublishReceipt`]: vaultproof_core::PublishReceipt
//! [`ReceiptStore`]: vaultproof_store::ReceiptStore

pub mod chain;
pub mod client;
pub mod config;
pub mod error;
pub mod synchronizer;
pub mod view;

pub use chain::ChainConfig;
pub use client::{ChainClient, SimulatedChain};
pub use config::{ChainEndpoint, LedgerConfig};
pub use error::{LedgerError, Result};
pub use synchronizer::LedgerSynchronizer;
pub use view::{window_bounds, AggregatedView, ChainState, LedgerEntry, SyncStatus};
