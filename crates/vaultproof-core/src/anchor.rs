//! Records of Merkle roots anchored on external chains.
//!
//! These types are produced by the ledger synchronizer and persisted by the
//! receipt store. They are immutable: confirmation progress is expressed by
//! building a new snapshot with [`ChainRecord::advanced`] or
//! [`PublishReceipt::with_chains`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::canonical::canonical_metadata_bytes;
use crate::crypto::{domain, Digest};
use crate::types::ReceiptId;

/// Free-form publish metadata, folded into the receipt id.
pub type PublishMetadata = BTreeMap<String, String>;

/// A chain name outside the supported set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown chain: {0}")]
pub struct UnknownChain(pub String);

/// The supported chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Ethereum,
    Polygon,
    Solana,
}

impl Chain {
    pub const ALL: [Chain; 3] = [Chain::Ethereum, Chain::Polygon, Chain::Solana];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ethereum => "ethereum",
            Self::Polygon => "polygon",
            Self::Solana => "solana",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = UnknownChain;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ethereum" => Ok(Self::Ethereum),
            "polygon" => Ok(Self::Polygon),
            "solana" => Ok(Self::Solana),
            other => Err(UnknownChain(other.to_string())),
        }
    }
}

/// Inclusion status of an anchoring transaction.
///
/// Moves forward only: `Pending → Confirmed → Finalized`, or
/// `Pending → Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainStatus {
    Pending,
    Confirmed,
    Finalized,
    Failed,
}

impl ChainStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Finalized => "finalized",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "finalized" => Some(Self::Finalized),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Confirmed => 1,
            Self::Finalized => 2,
            Self::Failed => 3,
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finalized | Self::Failed)
    }

    /// Whether `self → next` is a legal transition.
    pub fn can_become(&self, next: ChainStatus) -> bool {
        match (self, next) {
            (a, b) if *a == b => true,
            (Self::Failed, _) | (Self::Finalized, _) => false,
            (_, Self::Failed) => *self == Self::Pending,
            (a, b) => b.rank() > a.rank(),
        }
    }

    /// `next` if the transition is legal, otherwise `self`.
    pub fn advance(self, next: ChainStatus) -> ChainStatus {
        if self.can_become(next) {
            next
        } else {
            self
        }
    }
}

/// One chain's view of an anchoring transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainRecord {
    pub chain: Chain,
    /// The root this transaction anchors.
    pub merkle_root: Digest,
    pub tx_hash: Digest,
    pub block_number: u64,
    pub block_hash: Digest,
    pub confirmations: u64,
    pub status: ChainStatus,
    /// Submission time (Unix ms).
    pub timestamp: i64,
}

impl ChainRecord {
    /// A record for a submission the chain rejected.
    pub fn failed(chain: Chain, merkle_root: Digest, timestamp: i64) -> Self {
        Self {
            chain,
            merkle_root,
            tx_hash: Digest::ZERO,
            block_number: 0,
            block_hash: Digest::ZERO,
            confirmations: 0,
            status: ChainStatus::Failed,
            timestamp,
        }
    }

    /// Merkle leaf committing to this transaction.
    pub fn leaf(&self) -> Digest {
        Digest::hash_parts(
            domain::CHAIN_LEAF,
            &[
                self.chain.as_str().as_bytes(),
                self.tx_hash.as_bytes(),
                &self.block_number.to_be_bytes(),
            ],
        )
    }

    /// A newer snapshot. Confirmations never decrease and status only moves forward.
    pub fn advanced(&self, confirmations: u64, status: ChainStatus) -> Self {
        let status = self.status.advance(status);
        let confirmations = if status == ChainStatus::Failed {
            0
        } else {
            self.confirmations.max(confirmations)
        };
        Self {
            confirmations,
            status,
            ..self.clone()
        }
    }
}

/// Receipt for one Merkle root published to every configured chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReceipt {
    pub receipt_id: ReceiptId,
    pub merkle_root: Digest,
    pub chains: Vec<ChainRecord>,
    pub total_confirmations: u64,
    /// Every chain reached finality.
    pub fully_confirmed: bool,
    pub metadata: PublishMetadata,
    /// Publish time (Unix ms).
    pub timestamp: i64,
}

impl PublishReceipt {
    pub fn new(
        merkle_root: Digest,
        chains: Vec<ChainRecord>,
        metadata: PublishMetadata,
        timestamp: i64,
    ) -> Self {
        let receipt_id = Self::derive_id(&merkle_root, timestamp, &chains, &metadata);
        Self {
            receipt_id,
            merkle_root,
            total_confirmations: total_confirmations(&chains),
            fully_confirmed: fully_confirmed(&chains),
            chains,
            metadata,
            timestamp,
        }
    }

    /// Content address of a publish; independent of confirmation progress.
    pub fn derive_id(
        merkle_root: &Digest,
        timestamp: i64,
        chains: &[ChainRecord],
        metadata: &PublishMetadata,
    ) -> ReceiptId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(domain::RECEIPT_ID);
        hasher.update(merkle_root.as_bytes());
        hasher.update(&timestamp.to_be_bytes());
        for record in chains {
            hasher.update(record.chain.as_str().as_bytes());
            hasher.update(record.tx_hash.as_bytes());
        }
        hasher.update(&canonical_metadata_bytes(metadata));
        ReceiptId(Digest(*hasher.finalize().as_bytes()))
    }

    /// A new snapshot carrying updated chain records.
    pub fn with_chains(&self, chains: Vec<ChainRecord>) -> Self {
        Self {
            total_confirmations: total_confirmations(&chains),
            fully_confirmed: fully_confirmed(&chains),
            chains,
            ..self.clone()
        }
    }

    pub fn record(&self, chain: Chain) -> Option<&ChainRecord> {
        self.chains.iter().find(|r| r.chain == chain)
    }
}

fn total_confirmations(chains: &[ChainRecord]) -> u64 {
    chains.iter().map(|r| r.confirmations).sum()
}

fn fully_confirmed(chains: &[ChainRecord]) -> bool {
    !chains.is_empty() && chains.iter().all(|r| r.status == ChainStatus::Finalized)
}
