//! ReceiptStore trait: the abstract interface for publish receipt persistence.
//!
//! This trait keeps the ledger synchronizer storage-agnostic. Implementations
//! include SQLite (persistent) and in-memory (default, and for tests).

use async_trait::async_trait;
use vaultproof_core::{PublishReceipt, ReceiptId};

use crate::error::{Result, StoreError};

/// Result of inserting a receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertResult {
    /// Receipt was inserted successfully.
    Inserted,
    /// Receipt already exists (idempotent - not an error).
    AlreadyExists,
}

/// The ReceiptStore trait: async interface for the append-only receipt ledger.
///
/// # Design Notes
///
/// - **Atomic publish**: a receipt and all of its chain records become
///   visible together or not at all.
/// - **Append-only**: confirmation progress is recorded as a new snapshot
///   version. Earlier snapshots are never rewritten.
/// - **Idempotent inserts**: inserting the same receipt twice returns
///   `AlreadyExists`.
#[async_trait]
pub trait ReceiptStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Receipt Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a freshly published receipt as snapshot version 0.
    async fn insert_receipt(&self, receipt: &PublishReceipt) -> Result<InsertResult>;

    /// Latest snapshot of a receipt.
    async fn get_receipt(&self, id: &ReceiptId) -> Result<Option<PublishReceipt>>;

    /// Check if a receipt exists by ID.
    async fn has_receipt(&self, id: &ReceiptId) -> Result<bool>;

    /// Latest snapshot of every receipt, in publish order.
    async fn list_receipts(&self) -> Result<Vec<PublishReceipt>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Snapshot Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Append a newer snapshot of an existing receipt. Returns its version.
    ///
    /// Fails with `NotFound` for an unknown receipt and `Regression` if any
    /// chain record would move backwards.
    async fn append_snapshot(&self, snapshot: &PublishReceipt) -> Result<u32>;

    /// Every snapshot of a receipt, oldest first.
    async fn snapshot_history(&self, id: &ReceiptId) -> Result<Vec<PublishReceipt>>;
}

/// Convenience queries built on [`ReceiptStore`].
pub trait StoreExt: ReceiptStore {
    /// Latest snapshots of receipts published within `[start, end]` (Unix ms).
    fn receipts_between(
        &self,
        start: i64,
        end: i64,
    ) -> impl std::future::Future<Output = Result<Vec<PublishReceipt>>> + Send;
}

impl<S: ReceiptStore + ?Sized> StoreExt for S {
    async fn receipts_between(&self, start: i64, end: i64) -> Result<Vec<PublishReceipt>> {
        let receipts = self.list_receipts().await?;
        Ok(receipts
            .into_iter()
            .filter(|r| r.timestamp >= start && r.timestamp <= end)
            .collect())
    }
}

/// Reject a snapshot that is not a forward step from `prev`.
pub(crate) fn check_progress(prev: &PublishReceipt, next: &PublishReceipt) -> Result<()> {
    let regression = |reason: String| StoreError::Regression {
        receipt_id: prev.receipt_id.to_hex(),
        reason,
    };

    if prev.receipt_id != next.receipt_id || prev.merkle_root != next.merkle_root {
        return Err(regression("snapshot belongs to a different receipt".into()));
    }
    if prev.chains.len() != next.chains.len() {
        return Err(regression("chain set changed".into()));
    }

    for (old, new) in prev.chains.iter().zip(&next.chains) {
        if old.chain != new.chain || old.tx_hash != new.tx_hash {
            return Err(regression(format!("{} record replaced", old.chain)));
        }
        if !old.status.can_become(new.status) {
            return Err(regression(format!(
                "{} status {} -> {}",
                old.chain,
                old.status.as_str(),
                new.status.as_str()
            )));
        }
        if new.status != vaultproof_core::ChainStatus::Failed && new.confirmations < old.confirmations {
            return Err(regression(format!("{} confirmations decreased", old.chain)));
        }
    }
    Ok(())
}
