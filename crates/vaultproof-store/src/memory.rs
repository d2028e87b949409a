//! In-memory implementation of the ReceiptStore trait.
//!
//! Same semantics as SQLite but keeps everything in memory with no
//! persistence. A publish takes a single write lock, so readers never see a
//! receipt without its chain records.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::debug;

use vaultproof_core::{PublishReceipt, ReceiptId};

use crate::error::{Result, StoreError};
use crate::traits::{check_progress, InsertResult, ReceiptStore};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Snapshots per receipt, oldest first.
    snapshots: HashMap<ReceiptId, Vec<PublishReceipt>>,

    /// Publish order.
    order: Vec<ReceiptId>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner.write().map_err(|_| StoreError::Poisoned)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReceiptStore for MemoryStore {
    async fn insert_receipt(&self, receipt: &PublishReceipt) -> Result<InsertResult> {
        let mut inner = self.write()?;

        if inner.snapshots.contains_key(&receipt.receipt_id) {
            return Ok(InsertResult::AlreadyExists);
        }

        inner
            .snapshots
            .insert(receipt.receipt_id, vec![receipt.clone()]);
        inner.order.push(receipt.receipt_id);
        debug!(receipt_id = %receipt.receipt_id, chains = receipt.chains.len(), "receipt inserted");

        Ok(InsertResult::Inserted)
    }

    async fn get_receipt(&self, id: &ReceiptId) -> Result<Option<PublishReceipt>> {
        let inner = self.read()?;
        Ok(inner.snapshots.get(id).and_then(|s| s.last().cloned()))
    }

    async fn has_receipt(&self, id: &ReceiptId) -> Result<bool> {
        Ok(self.read()?.snapshots.contains_key(id))
    }

    async fn list_receipts(&self) -> Result<Vec<PublishReceipt>> {
        let inner = self.read()?;
        Ok(inner
            .order
            .iter()
            .filter_map(|id| inner.snapshots.get(id).and_then(|s| s.last().cloned()))
            .collect())
    }

    async fn append_snapshot(&self, snapshot: &PublishReceipt) -> Result<u32> {
        let mut inner = self.write()?;

        let history = inner
            .snapshots
            .get_mut(&snapshot.receipt_id)
            .ok_or_else(|| StoreError::NotFound(snapshot.receipt_id.to_hex()))?;

        if let Some(prev) = history.last() {
            check_progress(prev, snapshot)?;
        }
        history.push(snapshot.clone());

        Ok((history.len() - 1) as u32)
    }

    async fn snapshot_history(&self, id: &ReceiptId) -> Result<Vec<PublishReceipt>> {
        Ok(self.read()?.snapshots.get(id).cloned().unwrap_or_default())
    }
}
