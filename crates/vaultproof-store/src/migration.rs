//! Database schema migrations for SQLite.
//!
//! Each migration is a SQL batch that transforms the schema from version N to
//! N+1.

use rusqlite::Connection;

use vaultproof_core::now_millis;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// Idempotent: safe to call on every open.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One row per published Merkle root
        CREATE TABLE receipts (
            receipt_id BLOB PRIMARY KEY,      -- 32 bytes
            merkle_root BLOB NOT NULL,        -- 32 bytes, the anchored root
            metadata BLOB NOT NULL,           -- CBOR map of publish metadata
            timestamp INTEGER NOT NULL,       -- publish time (Unix ms)
            published_seq INTEGER NOT NULL    -- local publish order
        );

        -- Append-only chain record snapshots; version 0 is the publish itself
        CREATE TABLE chain_records (
            receipt_id BLOB NOT NULL REFERENCES receipts(receipt_id),
            version INTEGER NOT NULL,
            position INTEGER NOT NULL,        -- index within the receipt's chain list
            chain TEXT NOT NULL,
            tx_hash BLOB NOT NULL,
            block_number INTEGER NOT NULL,
            block_hash BLOB NOT NULL,
            confirmations INTEGER NOT NULL,
            status TEXT NOT NULL,             -- pending | confirmed | finalized | failed
            timestamp INTEGER NOT NULL,       -- submission time (Unix ms)
            recorded_at INTEGER NOT NULL,

            PRIMARY KEY (receipt_id, version, position)
        );

        CREATE INDEX idx_receipts_timestamp ON receipts(timestamp);
        CREATE INDEX idx_receipts_root ON receipts(merkle_root);
        CREATE INDEX idx_chain_records_status ON chain_records(status);
        "#,
    )?;

    Ok(())
}
