//! The ledger synchronizer: publishes roots to every chain and reads them
//! back as a unified ledger.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::{interval, timeout, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use vaultproof_core::{
    domain, merkle_root, now_millis, Chain, ChainRecord, Digest, PublishMetadata,
    PublishReceipt, ReceiptId,
};
use vaultproof_store::{InsertResult, ReceiptStore, StoreError};

use crate::chain::ChainConfig;
use crate::client::{ChainClient, SimulatedChain};
use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::view::{window_bounds, AggregatedView, ChainState, LedgerEntry, SyncStatus};

/// Publishes Merkle roots to every configured chain and tracks their
/// confirmation through the receipt store.
pub struct LedgerSynchronizer<S: ReceiptStore> {
    config: LedgerConfig,
    clients: BTreeMap<Chain, Arc<dyn ChainClient>>,
    store: Arc<S>,
}

impl<S: ReceiptStore> LedgerSynchronizer<S> {
    /// Synchronizer over simulated clients for every supported chain.
    pub fn new(config: LedgerConfig, store: Arc<S>) -> Self {
        let clients = Chain::ALL
            .into_iter()
            .map(|chain| {
                let chain_config = ChainConfig::for_chain(chain, config.endpoint(chain));
                Arc::new(SimulatedChain::new(chain_config, config.time_scale))
                    as Arc<dyn ChainClient>
            })
            .collect();
        Self::with_clients(config, store, clients)
    }

    /// Synchronizer over caller-supplied clients, one per chain.
    pub fn with_clients(
        config: LedgerConfig,
        store: Arc<S>,
        clients: Vec<Arc<dyn ChainClient>>,
    ) -> Self {
        let clients = clients.into_iter().map(|c| (c.chain(), c)).collect();
        Self {
            config,
            clients,
            store,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Chain Table
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve(&self, name: &str) -> Result<Chain> {
        let chain: Chain = name.parse()?;
        if self.clients.contains_key(&chain) {
            Ok(chain)
        } else {
            Err(LedgerError::UnknownChain(name.to_string()))
        }
    }

    /// Parameters of the named chain.
    pub fn chain_config(&self, name: &str) -> Result<ChainConfig> {
        let chain = self.resolve(name)?;
        Ok(ChainConfig::for_chain(chain, self.config.endpoint(chain)))
    }

    /// Chains this synchronizer publishes to.
    pub fn supported_chains(&self) -> Vec<Chain> {
        self.clients.keys().copied().collect()
    }

    /// Time until a transaction on the named chain is final.
    pub fn expected_confirmation_time(&self, name: &str) -> Result<Duration> {
        Ok(self.chain_config(name)?.finality)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ledger Views
    // ─────────────────────────────────────────────────────────────────────────

    /// Read every chain's anchored records and group them by root.
    ///
    /// A chain that cannot be read is skipped with a warning.
    pub async fn sync_ledger(&self) -> Result<Vec<LedgerEntry>> {
        let started = Instant::now();

        let mut tasks = JoinSet::new();
        for client in self.clients.values() {
            let client = client.clone();
            tasks.spawn(async move { (client.chain(), client.anchored_records().await) });
        }

        let mut by_root: BTreeMap<Digest, Vec<ChainRecord>> = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            let (chain, fetched) = joined.map_err(|e| LedgerError::Task(e.to_string()))?;
            match fetched {
                Ok(records) => {
                    for record in records {
                        by_root.entry(record.merkle_root).or_default().push(record);
                    }
                }
                Err(e) => warn!(%chain, error = %e, "skipping chain during sync"),
            }
        }

        let aggregation_time = started.elapsed();
        let mut entries: Vec<LedgerEntry> = by_root
            .into_iter()
            .map(|(root, mut chains)| {
                chains.sort_by(|a, b| a.chain.cmp(&b.chain).then(a.timestamp.cmp(&b.timestamp)));
                let leaves: Vec<Digest> = chains.iter().map(ChainRecord::leaf).collect();
                let mut parts: Vec<&[u8]> = vec![root.as_bytes().as_slice()];
                parts.extend(chains.iter().map(|r| r.tx_hash.as_bytes().as_slice()));

                LedgerEntry {
                    entry_id: Digest::hash_parts(domain::LEDGER_ENTRY, &parts),
                    data_hash: root,
                    merkle_root: merkle_root(&leaves),
                    timestamp: chains.iter().map(|r| r.timestamp).min().unwrap_or(0),
                    chains,
                    aggregation_time,
                }
            })
            .collect();
        entries.sort_by_key(|e| e.timestamp);

        debug!(entries = entries.len(), "ledger synced");
        Ok(entries)
    }

    /// Entries anchored within `window_ms` centred on `timestamp`.
    pub async fn aggregated_view(&self, timestamp: i64, window_ms: u64) -> Result<AggregatedView> {
        let (window_start, window_end) = window_bounds(timestamp, window_ms)?;

        let entries: Vec<LedgerEntry> = self
            .sync_ledger()
            .await?
            .into_iter()
            .filter(|e| e.timestamp >= window_start && e.timestamp <= window_end)
            .collect();

        let leaves: Vec<Digest> = entries
            .iter()
            .flat_map(|e| e.chains.iter().map(ChainRecord::leaf))
            .collect();
        let root = merkle_root(&leaves);

        let chain_states = self.chain_states().await?;
        let sync_status = SyncStatus::from_states(
            chain_states.values(),
            now_millis(),
            self.config.aggregation_window,
        );

        Ok(AggregatedView {
            view_id: Digest::hash_parts(
                domain::LEDGER_VIEW,
                &[
                    &timestamp.to_be_bytes(),
                    &window_ms.to_be_bytes(),
                    root.as_bytes(),
                ],
            ),
            timestamp,
            window_start,
            window_end,
            entries,
            merkle_root: root,
            chain_states,
            sync_status,
        })
    }

    /// Current state of every chain that answers.
    pub async fn chain_states(&self) -> Result<BTreeMap<Chain, ChainState>> {
        let mut tasks = JoinSet::new();
        for client in self.clients.values() {
            let client = client.clone();
            tasks.spawn(async move { (client.chain(), client.chain_state().await) });
        }

        let mut states = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            let (chain, state) = joined.map_err(|e| LedgerError::Task(e.to_string()))?;
            match state {
                Ok(state) => {
                    states.insert(chain, state);
                }
                Err(e) => warn!(%chain, error = %e, "chain state unavailable"),
            }
        }
        Ok(states)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Publishing
    // ─────────────────────────────────────────────────────────────────────────

    /// Publish `root` to every chain and persist the receipt.
    ///
    /// A chain that rejects the submission is recorded as `Failed`; the
    /// publish still succeeds.
    pub async fn publish_merkle_root(
        &self,
        root: Digest,
        metadata: PublishMetadata,
    ) -> Result<PublishReceipt> {
        let timestamp = now_millis();

        let mut tasks = JoinSet::new();
        for client in self.clients.values() {
            let client = client.clone();
            let metadata = metadata.clone();
            tasks.spawn(async move { (client.chain(), client.submit(&root, &metadata).await) });
        }

        let mut records = Vec::with_capacity(self.clients.len());
        while let Some(joined) = tasks.join_next().await {
            let (chain, submitted) = joined.map_err(|e| LedgerError::Task(e.to_string()))?;
            match submitted {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(%chain, %root, error = %e, "publish failed on chain");
                    records.push(ChainRecord::failed(chain, root, timestamp));
                }
            }
        }
        records.sort_by_key(|r| r.chain);

        let receipt = PublishReceipt::new(root, records, metadata, timestamp);
        if self.store.insert_receipt(&receipt).await? == InsertResult::AlreadyExists {
            debug!(receipt_id = %receipt.receipt_id, "receipt already stored");
        }

        info!(
            receipt_id = %receipt.receipt_id,
            %root,
            chains = receipt.chains.len(),
            "merkle root published"
        );
        Ok(receipt)
    }

    /// Latest stored snapshot of a receipt.
    pub async fn receipt(&self, id: &ReceiptId) -> Result<Option<PublishReceipt>> {
        Ok(self.store.get_receipt(id).await?)
    }

    /// Poll every chain record that is not yet terminal and store the new
    /// snapshot if anything advanced.
    pub async fn refresh_receipt(&self, id: &ReceiptId) -> Result<PublishReceipt> {
        let current = self
            .store
            .get_receipt(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_hex()))?;

        let mut chains = Vec::with_capacity(current.chains.len());
        for record in &current.chains {
            let client = match self.clients.get(&record.chain) {
                Some(client) if !record.status.is_terminal() => client,
                _ => {
                    chains.push(record.clone());
                    continue;
                }
            };
            match client.poll(record).await {
                Ok(polled) => chains.push(record.advanced(polled.confirmations, polled.status)),
                Err(e) => {
                    warn!(chain = %record.chain, error = %e, "poll failed");
                    chains.push(record.clone());
                }
            }
        }

        if chains == current.chains {
            return Ok(current);
        }

        let next = current.with_chains(chains);
        let version = self.store.append_snapshot(&next).await?;
        debug!(
            receipt_id = %id,
            version,
            confirmations = next.total_confirmations,
            "receipt advanced"
        );
        Ok(next)
    }

    /// Wait until the receipt has at least `required` confirmations summed
    /// across chains.
    ///
    /// Returns `false` for an unknown receipt or on timeout.
    pub async fn wait_for_confirmation(&self, id: &ReceiptId, required: u64) -> bool {
        let poll = async {
            let mut ticker = interval(self.config.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match self.refresh_receipt(id).await {
                    Ok(receipt) if receipt.total_confirmations >= required => return true,
                    Ok(_) => {}
                    Err(LedgerError::Store(StoreError::NotFound(_))) => {
                        warn!(receipt_id = %id, "confirmation requested for unknown receipt");
                        return false;
                    }
                    Err(e) => warn!(receipt_id = %id, error = %e, "refresh failed"),
                }
            }
        };

        match timeout(self.config.confirmation_timeout, poll).await {
            Ok(confirmed) => confirmed,
            Err(_) => {
                warn!(
                    receipt_id = %id,
                    required,
                    timeout_ms = self.config.confirmation_timeout.as_millis() as u64,
                    "confirmation wait timed out"
                );
                false
            }
        }
    }

    /// Check a Merkle inclusion path.
    pub fn verify_merkle_proof(&self, leaf: &Digest, path: &[Digest], root: &Digest) -> bool {
        vaultproof_core::verify_merkle_proof(leaf, path, root)
    }
}
