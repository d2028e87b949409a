//! # VaultProof Store
//!
//! Storage abstraction for publish receipts. Provides a trait-based interface
//! with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! The ledger synchronizer persists every [`PublishReceipt`] through the
//! [`ReceiptStore`] trait. The default backend is [`MemoryStore`];
//! [`SqliteStore`] keeps receipts across restarts.
//!
//! ## Key Types
//!
//! - [`ReceiptStore`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage
//! - [`InsertResult`] - Result of inserting a receipt
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vaultproof_store::{ReceiptStore, SqliteStore};
//!
//! async fn example() {
//!     let store = SqliteStore::open("receipts.db").unwrap();
//!     let receipts = store.list_receipts().await.unwrap();
//!     println!("{} receipts", receipts.len());
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Atomic publish**: a receipt and its chain records land in one write
//! - **Snapshots**: confirmation progress appends a new version
//! - **No regression**: a snapshot that moves any record backwards is rejected
//!
//! [`PublishReceipt`]: vaultproof_core::PublishReceipt

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{InsertResult, ReceiptStore, StoreExt};
