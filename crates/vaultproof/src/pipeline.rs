//! The Pipeline: proofs in, anchored Merkle roots out.
//!
//! Wires the proof constructor to the ledger synchronizer and reports every
//! step on an optional bounded event channel.

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use vaultproof_core::{
    now_millis, verify_merkle_inclusion, AggregatedProof, ProofConstructor, ProofVerification,
    PublishMetadata, PublishReceipt, ReceiptId, RecursiveProof, ZkProof, ZkProofParams,
};
use vaultproof_ledger::{LedgerConfig, LedgerSynchronizer};
use vaultproof_store::{MemoryStore, ReceiptStore};

use crate::error::Result;
use crate::events::PipelineEvent;
use crate::scheduler::SchedulerConfig;

/// Default event channel capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Configuration for a pipeline and its scheduler.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub ledger: LedgerConfig,
    pub scheduler: SchedulerConfig,
    pub event_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ledger: LedgerConfig::default(),
            scheduler: SchedulerConfig::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl PipelineConfig {
    /// Ledger and export settings from the environment.
    pub fn from_env() -> Self {
        Self {
            ledger: LedgerConfig::from_env(),
            scheduler: SchedulerConfig::from_env(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// Result of [`Pipeline::anchor_batch`].
#[derive(Debug, Clone)]
pub struct AnchoredBatch {
    pub aggregated: AggregatedProof,
    pub receipt: PublishReceipt,
}

/// The pipeline context object.
pub struct Pipeline<S: ReceiptStore> {
    constructor: ProofConstructor,
    ledger: Arc<LedgerSynchronizer<S>>,
    events: Option<mpsc::Sender<PipelineEvent>>,
}

impl Pipeline<MemoryStore> {
    /// Pipeline over simulated chains and an in-memory receipt store.
    pub fn in_memory(config: LedgerConfig) -> Self {
        let ledger = LedgerSynchronizer::new(config, Arc::new(MemoryStore::new()));
        Self::new(Arc::new(ledger))
    }
}

impl<S: ReceiptStore> Pipeline<S> {
    pub fn new(ledger: Arc<LedgerSynchronizer<S>>) -> Self {
        Self {
            constructor: ProofConstructor::new(),
            ledger,
            events: None,
        }
    }

    /// Attach a bounded event channel and return its receiver.
    ///
    /// Events that find the channel full are dropped with a warning; an
    /// undrained receiver never blocks pipeline operations.
    pub fn with_events(mut self, capacity: usize) -> (Self, mpsc::Receiver<PipelineEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        self.events = Some(tx);
        (self, rx)
    }

    pub fn constructor(&self) -> &ProofConstructor {
        &self.constructor
    }

    pub fn ledger(&self) -> &Arc<LedgerSynchronizer<S>> {
        &self.ledger
    }

    fn emit(&self, event: PipelineEvent) {
        let Some(tx) = &self.events else {
            return;
        };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(kind = ?event.kind(), "event channel full, dropping event");
            }
            Err(TrySendError::Closed(_)) => debug!("event receiver dropped"),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Proof Operations
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn generate_proof(&self, params: ZkProofParams) -> Result<ZkProof> {
        let proof = self.constructor.generate_proof(params)?;
        self.emit(PipelineEvent::ProofSubmitted {
            proof_id: proof.proof_id,
            proof_hash: proof.proof_hash,
            fidelity: proof.quantum_fidelity,
            timestamp: now_millis(),
        });
        Ok(proof)
    }

    pub async fn verify_proof(&self, proof: &ZkProof) -> ProofVerification {
        let verification = self.constructor.verify_proof(proof);
        self.emit(PipelineEvent::ProofVerified {
            proof_hash: proof.proof_hash,
            valid: verification.valid,
            timestamp: now_millis(),
        });
        verification
    }

    pub fn aggregate_proofs(&self, proofs: Vec<ZkProof>) -> AggregatedProof {
        self.constructor.aggregate_proofs(proofs)
    }

    pub fn create_recursive_proof(&self, base: &ZkProof, depth: usize) -> Result<RecursiveProof> {
        Ok(self.constructor.create_recursive_proof(base, depth)?)
    }

    /// Whether proof `index` of `aggregated` is included under its root.
    ///
    /// The leaf is recomputed from the proof's fields and checked at its
    /// position in a tree of `aggregated.proofs.len()` leaves.
    pub fn verify_inclusion(&self, aggregated: &AggregatedProof, index: usize) -> bool {
        match (aggregated.proofs.get(index), aggregated.inclusion_proof(index)) {
            (Some(proof), Some(path)) => verify_merkle_inclusion(
                &proof.compute_hash(),
                index,
                aggregated.proofs.len(),
                &path,
                &aggregated.merkle_root,
            ),
            _ => false,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ledger Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Publish the aggregated root to every chain.
    pub async fn publish(
        &self,
        aggregated: &AggregatedProof,
        mut metadata: PublishMetadata,
    ) -> Result<PublishReceipt> {
        metadata
            .entry("aggregation_id".into())
            .or_insert_with(|| aggregated.aggregation_id.to_hex());
        metadata
            .entry("proofs".into())
            .or_insert_with(|| aggregated.proofs.len().to_string());

        let receipt = self
            .ledger
            .publish_merkle_root(aggregated.merkle_root, metadata)
            .await?;
        self.emit(PipelineEvent::RootPublished {
            receipt_id: receipt.receipt_id,
            merkle_root: receipt.merkle_root,
            chains: receipt.chains.len(),
            timestamp: receipt.timestamp,
        });
        Ok(receipt)
    }

    pub async fn wait_for_confirmation(&self, id: &ReceiptId, required: u64) -> bool {
        let confirmed = self.ledger.wait_for_confirmation(id, required).await;
        self.emit(PipelineEvent::ConfirmationResolved {
            receipt_id: *id,
            confirmed,
            timestamp: now_millis(),
        });
        confirmed
    }

    /// Generate a proof per params, aggregate them and publish the root.
    ///
    /// Fails on the first invalid params, before anything is published.
    pub async fn anchor_batch(&self, params: Vec<ZkProofParams>) -> Result<AnchoredBatch> {
        let mut proofs = Vec::with_capacity(params.len());
        for p in params {
            proofs.push(self.generate_proof(p).await?);
        }

        let aggregated = self.aggregate_proofs(proofs);
        let receipt = self.publish(&aggregated, PublishMetadata::new()).await?;

        info!(
            proofs = aggregated.proofs.len(),
            root = %aggregated.merkle_root,
            receipt_id = %receipt.receipt_id,
            "batch anchored"
        );
        Ok(AnchoredBatch {
            aggregated,
            receipt,
        })
    }
}
