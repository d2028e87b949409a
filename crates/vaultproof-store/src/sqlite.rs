//! SQLite implementation of the ReceiptStore trait.
//!
//! Persistent backend for the receipt ledger, using rusqlite with bundled
//! SQLite wrapped in async via tokio::spawn_blocking. Every write runs inside
//! a single transaction.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use tracing::debug;

use vaultproof_core::{
    now_millis, Chain, ChainRecord, ChainStatus, Digest, PublishMetadata, PublishReceipt,
    ReceiptId,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{check_progress, InsertResult, ReceiptStore};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` on the connection from the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn digest_from(bytes: Vec<u8>, column: &str) -> Result<Digest> {
    let arr: [u8; 32] = bytes
        .try_into()
        .map_err(|_| StoreError::InvalidData(format!("{column} is not 32 bytes")))?;
    Ok(Digest::from_bytes(arr))
}

fn encode_metadata(metadata: &PublishMetadata) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(metadata, &mut buf)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn decode_metadata(bytes: &[u8]) -> Result<PublishMetadata> {
    ciborium::from_reader(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

type RecordRow = (String, Vec<u8>, i64, Vec<u8>, i64, String, i64);

fn record_from_row(merkle_root: Digest, row: RecordRow) -> Result<ChainRecord> {
    let (chain, tx_hash, block_number, block_hash, confirmations, status, timestamp) = row;
    Ok(ChainRecord {
        chain: chain
            .parse::<Chain>()
            .map_err(|e| StoreError::InvalidData(e.to_string()))?,
        merkle_root,
        tx_hash: digest_from(tx_hash, "tx_hash")?,
        block_number: block_number as u64,
        block_hash: digest_from(block_hash, "block_hash")?,
        confirmations: confirmations as u64,
        status: ChainStatus::parse(&status)
            .ok_or_else(|| StoreError::InvalidData(format!("unknown status {status}")))?,
        timestamp,
    })
}

fn write_records(
    tx: &Transaction<'_>,
    receipt_id: &ReceiptId,
    version: u32,
    records: &[ChainRecord],
) -> Result<()> {
    let now = now_millis();
    for (position, record) in records.iter().enumerate() {
        tx.execute(
            "INSERT INTO chain_records (
                receipt_id, version, position, chain, tx_hash, block_number,
                block_hash, confirmations, status, timestamp, recorded_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                receipt_id.as_bytes().as_slice(),
                version,
                position as i64,
                record.chain.as_str(),
                record.tx_hash.as_bytes().as_slice(),
                record.block_number as i64,
                record.block_hash.as_bytes().as_slice(),
                record.confirmations as i64,
                record.status.as_str(),
                record.timestamp,
                now,
            ],
        )?;
    }
    Ok(())
}

fn latest_version(conn: &Connection, id: &ReceiptId) -> Result<Option<u32>> {
    let version: Option<u32> = conn.query_row(
        "SELECT MAX(version) FROM chain_records WHERE receipt_id = ?1",
        params![id.as_bytes().as_slice()],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// Load one snapshot version of a receipt.
fn load_snapshot(conn: &Connection, id: &ReceiptId, version: u32) -> Result<Option<PublishReceipt>> {
    let header: Option<(Vec<u8>, Vec<u8>, i64)> = conn
        .query_row(
            "SELECT merkle_root, metadata, timestamp FROM receipts WHERE receipt_id = ?1",
            params![id.as_bytes().as_slice()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;

    let Some((root, metadata, timestamp)) = header else {
        return Ok(None);
    };
    let merkle_root = digest_from(root, "merkle_root")?;

    let mut stmt = conn.prepare(
        "SELECT chain, tx_hash, block_number, block_hash, confirmations, status, timestamp
         FROM chain_records WHERE receipt_id = ?1 AND version = ?2
         ORDER BY position",
    )?;
    let rows = stmt
        .query_map(params![id.as_bytes().as_slice(), version], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<RecordRow>>>()?;

    let chains = rows
        .into_iter()
        .map(|row| record_from_row(merkle_root, row))
        .collect::<Result<Vec<_>>>()?;

    let base = PublishReceipt {
        receipt_id: *id,
        merkle_root,
        chains: Vec::new(),
        total_confirmations: 0,
        fully_confirmed: false,
        metadata: decode_metadata(&metadata)?,
        timestamp,
    };
    Ok(Some(base.with_chains(chains)))
}

fn load_latest(conn: &Connection, id: &ReceiptId) -> Result<Option<PublishReceipt>> {
    let version = latest_version(conn, id)?.unwrap_or(0);
    load_snapshot(conn, id, version)
}

#[async_trait]
impl ReceiptStore for SqliteStore {
    async fn insert_receipt(&self, receipt: &PublishReceipt) -> Result<InsertResult> {
        let receipt = receipt.clone();

        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let id = receipt.receipt_id;

            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM receipts WHERE receipt_id = ?1)",
                params![id.as_bytes().as_slice()],
                |row| row.get(0),
            )?;
            if exists {
                return Ok(InsertResult::AlreadyExists);
            }

            let seq: i64 = tx.query_row(
                "SELECT COALESCE(MAX(published_seq), 0) + 1 FROM receipts",
                [],
                |row| row.get(0),
            )?;

            tx.execute(
                "INSERT INTO receipts (receipt_id, merkle_root, metadata, timestamp, published_seq)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id.as_bytes().as_slice(),
                    receipt.merkle_root.as_bytes().as_slice(),
                    encode_metadata(&receipt.metadata)?,
                    receipt.timestamp,
                    seq,
                ],
            )?;
            write_records(&tx, &id, 0, &receipt.chains)?;
            tx.commit()?;

            debug!(receipt_id = %id, seq, "receipt persisted");
            Ok(InsertResult::Inserted)
        })
        .await
    }

    async fn get_receipt(&self, id: &ReceiptId) -> Result<Option<PublishReceipt>> {
        let id = *id;
        self.blocking(move |conn| load_latest(conn, &id)).await
    }

    async fn has_receipt(&self, id: &ReceiptId) -> Result<bool> {
        let id = *id;
        self.blocking(move |conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM receipts WHERE receipt_id = ?1)",
                params![id.as_bytes().as_slice()],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
        .await
    }

    async fn list_receipts(&self) -> Result<Vec<PublishReceipt>> {
        self.blocking(|conn| {
            let mut stmt = conn.prepare("SELECT receipt_id FROM receipts ORDER BY published_seq")?;
            let ids = stmt
                .query_map([], |row| row.get::<_, Vec<u8>>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut receipts = Vec::with_capacity(ids.len());
            for raw in ids {
                let id = ReceiptId(digest_from(raw, "receipt_id")?);
                if let Some(receipt) = load_latest(conn, &id)? {
                    receipts.push(receipt);
                }
            }
            Ok(receipts)
        })
        .await
    }

    async fn append_snapshot(&self, snapshot: &PublishReceipt) -> Result<u32> {
        let snapshot = snapshot.clone();

        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let id = snapshot.receipt_id;

            let version = latest_version(&tx, &id)?.unwrap_or(0);
            let prev = load_snapshot(&tx, &id, version)?
                .ok_or_else(|| StoreError::NotFound(id.to_hex()))?;
            check_progress(&prev, &snapshot)?;

            let next = version + 1;
            write_records(&tx, &id, next, &snapshot.chains)?;
            tx.commit()?;
            Ok(next)
        })
        .await
    }

    async fn snapshot_history(&self, id: &ReceiptId) -> Result<Vec<PublishReceipt>> {
        let id = *id;
        self.blocking(move |conn| {
            let Some(latest) = latest_version(conn, &id)? else {
                return Ok(load_snapshot(conn, &id, 0)?.into_iter().collect());
            };
            let mut history = Vec::with_capacity(latest as usize + 1);
            for version in 0..=latest {
                if let Some(snapshot) = load_snapshot(conn, &id, version)? {
                    history.push(snapshot);
                }
            }
            Ok(history)
        })
        .await
    }
}
