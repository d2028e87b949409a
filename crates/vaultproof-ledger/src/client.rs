//! Chain client abstraction and the simulated implementation.
//!
//! A [`ChainClient`] anchors Merkle roots on one chain and reports their
//! inclusion progress. [`SimulatedChain`] produces blocks from the tokio
//! clock at the chain's block time, so tests can drive it with a paused
//! runtime.
//!
//! Heights and confirmations follow the tokio clock. Record timestamps and
//! `synced_at` are wall-clock Unix milliseconds, the same clock callers pass
//! to `aggregated_view`. Advancing a paused runtime therefore moves
//! confirmations without moving timestamps.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use vaultproof_core::{
    domain, merkle_root, now_millis, Chain, ChainRecord, ChainStatus, Digest, PublishMetadata,
};

use crate::chain::ChainConfig;
use crate::error::{LedgerError, Result};
use crate::view::ChainState;

/// First block of a simulated chain.
const GENESIS_HEIGHT: u64 = 1;

/// Client for one chain.
#[async_trait]
pub trait ChainClient: Send + Sync {
    fn chain(&self) -> Chain;

    /// Submit an anchoring transaction for `root`.
    async fn submit(&self, root: &Digest, metadata: &PublishMetadata) -> Result<ChainRecord>;

    /// Current view of a previously submitted transaction.
    async fn poll(&self, record: &ChainRecord) -> Result<ChainRecord>;

    async fn chain_state(&self) -> Result<ChainState>;

    /// Every anchoring transaction the chain knows of, at current progress.
    async fn anchored_records(&self) -> Result<Vec<ChainRecord>>;
}

/// In-process chain that mines blocks on the tokio clock.
pub struct SimulatedChain {
    config: ChainConfig,
    time_scale: f64,
    genesis: Instant,
    sequence: AtomicU64,
    failing: AtomicBool,
    submitted: RwLock<Submitted>,
}

/// Submitted transactions by hash, plus submission order.
#[derive(Default)]
struct Submitted {
    by_tx: HashMap<Digest, ChainRecord>,
    order: Vec<Digest>,
}

impl SimulatedChain {
    pub fn new(config: ChainConfig, time_scale: f64) -> Self {
        Self {
            config,
            time_scale,
            genesis: Instant::now(),
            sequence: AtomicU64::new(0),
            failing: AtomicBool::new(false),
            submitted: RwLock::new(Submitted::default()),
        }
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Make subsequent submissions fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Current block height.
    pub fn height(&self) -> u64 {
        let elapsed = self.genesis.elapsed().as_secs_f64() * self.time_scale;
        let block = self.config.block_time.as_secs_f64();
        GENESIS_HEIGHT + (elapsed / block) as u64
    }

    fn block_hash(&self, number: u64) -> Digest {
        Digest::hash_parts(
            domain::CHAIN_BLOCK,
            &[self.config.chain.as_str().as_bytes(), &number.to_be_bytes()],
        )
    }

    /// `record` as seen at `height`.
    fn progress(&self, record: &ChainRecord, height: u64) -> ChainRecord {
        if record.status == ChainStatus::Failed {
            return record.clone();
        }
        let confirmations = if height >= record.block_number {
            height - record.block_number + 1
        } else {
            0
        };
        let status = if confirmations >= self.config.finality_blocks() {
            ChainStatus::Finalized
        } else if confirmations > 0 {
            ChainStatus::Confirmed
        } else {
            ChainStatus::Pending
        };
        record.advanced(confirmations, status)
    }
}

#[async_trait]
impl ChainClient for SimulatedChain {
    fn chain(&self) -> Chain {
        self.config.chain
    }

    async fn submit(&self, root: &Digest, metadata: &PublishMetadata) -> Result<ChainRecord> {
        let chain = self.config.chain;
        if self.failing.load(Ordering::SeqCst) {
            return Err(LedgerError::Chain {
                chain,
                message: "submission rejected".into(),
            });
        }

        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let block_number = self.height() + 1;
        let record = ChainRecord {
            chain,
            merkle_root: *root,
            tx_hash: Digest::hash_parts(
                domain::CHAIN_TX,
                &[chain.as_str().as_bytes(), root.as_bytes(), &seq.to_be_bytes()],
            ),
            block_number,
            block_hash: self.block_hash(block_number),
            confirmations: 0,
            status: ChainStatus::Pending,
            timestamp: now_millis(),
        };

        {
            let mut submitted = self.submitted.write().await;
            submitted.order.push(record.tx_hash);
            submitted.by_tx.insert(record.tx_hash, record.clone());
        }
        debug!(%chain, block_number, metadata = metadata.len(), "root submitted");
        Ok(record)
    }

    async fn poll(&self, record: &ChainRecord) -> Result<ChainRecord> {
        let submitted = self.submitted.read().await;
        let known = submitted
            .by_tx
            .get(&record.tx_hash)
            .ok_or_else(|| LedgerError::Chain {
                chain: self.config.chain,
                message: format!("unknown transaction {}", record.tx_hash),
            })?;
        Ok(self.progress(known, self.height()))
    }

    async fn chain_state(&self) -> Result<ChainState> {
        let height = self.height();
        let records = self.anchored_records().await?;
        let leaves: Vec<Digest> = records.iter().map(ChainRecord::leaf).collect();
        let pending = records.iter().filter(|r| !r.status.is_terminal()).count();

        Ok(ChainState {
            chain: self.config.chain,
            latest_block: height,
            latest_block_hash: self.block_hash(height),
            state_root: merkle_root(&leaves),
            pending_transactions: pending as u64,
            synced_at: now_millis(),
        })
    }

    async fn anchored_records(&self) -> Result<Vec<ChainRecord>> {
        let height = self.height();
        let submitted = self.submitted.read().await;
        Ok(submitted
            .order
            .iter()
            .filter_map(|tx| submitted.by_tx.get(tx))
            .map(|r| self.progress(r, height))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn chain(chain: Chain) -> SimulatedChain {
        SimulatedChain::new(ChainConfig::for_chain(chain, None), 1.0)
    }

    #[tokio::test(start_paused = true)]
    async fn test_height_follows_block_time() {
        let eth = chain(Chain::Ethereum);
        assert_eq!(eth.height(), GENESIS_HEIGHT);

        tokio::time::advance(Duration::from_secs(25)).await;
        assert_eq!(eth.height(), GENESIS_HEIGHT + 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_scale() {
        let polygon = SimulatedChain::new(ChainConfig::for_chain(Chain::Polygon, None), 10.0);
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(polygon.height(), GENESIS_HEIGHT + 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmations_progress() {
        let polygon = chain(Chain::Polygon);
        let root = Digest::hash(b"root");
        let record = polygon.submit(&root, &PublishMetadata::new()).await.unwrap();
        assert_eq!(record.status, ChainStatus::Pending);
        assert_eq!(record.confirmations, 0);

        tokio::time::advance(Duration::from_secs(2)).await;
        let polled = polygon.poll(&record).await.unwrap();
        assert_eq!(polled.confirmations, 1);
        assert_eq!(polled.status, ChainStatus::Confirmed);

        tokio::time::advance(Duration::from_secs(128)).await;
        let polled = polygon.poll(&record).await.unwrap();
        assert_eq!(polled.status, ChainStatus::Finalized);
    }

    #[tokio::test(start_paused = true)]
    async fn test_solana_finalizes_in_one_slot() {
        let solana = chain(Chain::Solana);
        let record = solana
            .submit(&Digest::hash(b"r"), &PublishMetadata::new())
            .await
            .unwrap();
        tokio::time::advance(Duration::from_millis(400)).await;
        assert_eq!(
            solana.poll(&record).await.unwrap().status,
            ChainStatus::Finalized
        );
    }

    #[tokio::test]
    async fn test_hashes_are_distinct_per_submission() {
        let eth = chain(Chain::Ethereum);
        let root = Digest::hash(b"root");
        let a = eth.submit(&root, &PublishMetadata::new()).await.unwrap();
        let b = eth.submit(&root, &PublishMetadata::new()).await.unwrap();
        assert_ne!(a.tx_hash, b.tx_hash);
        assert_eq!(eth.anchored_records().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failing_and_unknown() {
        let eth = chain(Chain::Ethereum);
        eth.set_failing(true);
        let err = eth.submit(&Digest::hash(b"r"), &PublishMetadata::new()).await;
        assert!(matches!(err, Err(LedgerError::Chain { chain: Chain::Ethereum, .. })));

        let stranger = ChainRecord::failed(Chain::Ethereum, Digest::hash(b"r"), 0);
        assert!(eth.poll(&stranger).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_finds_each_submission() {
        let polygon = chain(Chain::Polygon);
        let mut records = Vec::new();
        for i in 0u8..50 {
            let record = polygon
                .submit(&Digest::hash(&[i]), &PublishMetadata::new())
                .await
                .unwrap();
            records.push(record);
        }

        tokio::time::advance(Duration::from_secs(4)).await;
        for record in &records {
            let polled = polygon.poll(record).await.unwrap();
            assert_eq!(polled.tx_hash, record.tx_hash);
            assert_eq!(polled.merkle_root, record.merkle_root);
            assert_eq!(polled.confirmations, 2);
        }

        let anchored = polygon.anchored_records().await.unwrap();
        let order: Vec<Digest> = anchored.iter().map(|r| r.tx_hash).collect();
        let expected: Vec<Digest> = records.iter().map(|r| r.tx_hash).collect();
        assert_eq!(order, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timestamps_are_wall_clock() {
        let eth = chain(Chain::Ethereum);
        let before = now_millis();
        let record = eth
            .submit(&Digest::hash(b"r"), &PublishMetadata::new())
            .await
            .unwrap();
        assert!(record.timestamp >= before);

        tokio::time::advance(Duration::from_secs(600)).await;
        let polled = eth.poll(&record).await.unwrap();
        assert!(polled.confirmations > 40);
        assert_eq!(polled.timestamp, record.timestamp);

        let state = eth.chain_state().await.unwrap();
        assert!(state.synced_at - before < 60_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_chain_state_counts_pending() {
        let polygon = chain(Chain::Polygon);
        polygon
            .submit(&Digest::hash(b"a"), &PublishMetadata::new())
            .await
            .unwrap();
        let state = polygon.chain_state().await.unwrap();
        assert_eq!(state.pending_transactions, 1);
        assert_eq!(state.latest_block, GENESIS_HEIGHT);

        tokio::time::advance(Duration::from_secs(200)).await;
        let state = polygon.chain_state().await.unwrap();
        assert_eq!(state.pending_transactions, 0);
    }
}
