//! Static per-chain parameters.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use vaultproof_core::Chain;

use crate::config::ChainEndpoint;

/// Timing and endpoint parameters of one chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain: Chain,
    /// EVM chain id. Solana has none.
    pub chain_id: Option<u64>,
    pub name: String,
    pub rpc_url: Option<String>,
    pub contract_address: Option<String>,
    /// Average block (or slot) time.
    pub block_time: Duration,
    /// Time after inclusion until a transaction is irreversible.
    pub finality: Duration,
}

impl ChainConfig {
    /// Parameters for `chain`, with endpoints taken from `endpoint`.
    pub fn for_chain(chain: Chain, endpoint: Option<&ChainEndpoint>) -> Self {
        let (chain_id, name, block_time, finality) = match chain {
            Chain::Ethereum => (
                Some(1),
                "Ethereum",
                Duration::from_secs(12),
                Duration::from_secs(780),
            ),
            Chain::Polygon => (
                Some(137),
                "Polygon",
                Duration::from_secs(2),
                Duration::from_secs(128),
            ),
            Chain::Solana => (
                None,
                "Solana",
                Duration::from_millis(400),
                Duration::from_millis(400),
            ),
        };

        let endpoint = endpoint.cloned().unwrap_or_default();
        Self {
            chain,
            chain_id,
            name: name.to_string(),
            rpc_url: endpoint.rpc_url,
            contract_address: endpoint.contract_address,
            block_time,
            finality,
        }
    }

    /// Blocks built atop inclusion before a transaction is final. At least 1.
    pub fn finality_blocks(&self) -> u64 {
        let block = self.block_time.as_millis().max(1);
        let blocks = self.finality.as_millis().div_ceil(block);
        u64::try_from(blocks).unwrap_or(u64::MAX).max(1)
    }
}
