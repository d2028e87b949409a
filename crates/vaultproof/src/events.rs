//! Pipeline events and the dashboard state they build.
//!
//! Every pipeline operation emits a [`PipelineEvent`]. The scheduler folds
//! them into a [`Dashboard`], which keeps per-proof summaries and an
//! [`EventGraph`] linking each event to recent events of the same kind.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use vaultproof_core::{Digest, FidelityMetrics, ReceiptId};
use vaultproof_ledger::SyncStatus;

/// Maximum number of nodes the event graph retains.
pub const GRAPH_CAPACITY: usize = 1000;

/// Same-kind predecessors each graph node links to.
pub const GRAPH_FAN_IN: usize = 3;

/// Something the pipeline did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    ProofSubmitted {
        proof_id: Digest,
        proof_hash: Digest,
        fidelity: f64,
        timestamp: i64,
    },
    ProofVerified {
        proof_hash: Digest,
        valid: bool,
        timestamp: i64,
    },
    RootPublished {
        receipt_id: ReceiptId,
        merkle_root: Digest,
        chains: usize,
        timestamp: i64,
    },
    ConfirmationResolved {
        receipt_id: ReceiptId,
        confirmed: bool,
        timestamp: i64,
    },
}

impl PipelineEvent {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::ProofSubmitted { .. } => NodeKind::Proof,
            Self::ProofVerified { .. } => NodeKind::Verification,
            Self::RootPublished { .. } => NodeKind::Publish,
            Self::ConfirmationResolved { .. } => NodeKind::Confirmation,
        }
    }

    /// The proof hash or receipt id the event is about.
    pub fn subject(&self) -> Digest {
        match self {
            Self::ProofSubmitted { proof_hash, .. } | Self::ProofVerified { proof_hash, .. } => {
                *proof_hash
            }
            Self::RootPublished { receipt_id, .. }
            | Self::ConfirmationResolved { receipt_id, .. } => receipt_id.0,
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            Self::ProofSubmitted { timestamp, .. }
            | Self::ProofVerified { timestamp, .. }
            | Self::RootPublished { timestamp, .. }
            | Self::ConfirmationResolved { timestamp, .. } => *timestamp,
        }
    }
}

/// Kind of an event graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Proof,
    Verification,
    Publish,
    Confirmation,
    /// A periodic sync snapshot.
    Metric,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: u64,
    pub kind: NodeKind,
    pub subject: Digest,
    pub timestamp: i64,
    /// Ids of the most recent earlier nodes of the same kind, newest first.
    pub edges: Vec<u64>,
}

/// Bounded provenance graph of pipeline events.
///
/// Oldest nodes are evicted first once the capacity is reached; edges to
/// evicted nodes are left dangling.
#[derive(Debug, Clone)]
pub struct EventGraph {
    nodes: VecDeque<GraphNode>,
    next_id: u64,
    capacity: usize,
}

impl EventGraph {
    pub fn new() -> Self {
        Self::with_capacity(GRAPH_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: VecDeque::new(),
            next_id: 0,
            capacity: capacity.max(1),
        }
    }

    /// Add a node and return its id.
    pub fn push(&mut self, kind: NodeKind, subject: Digest, timestamp: i64) -> u64 {
        let edges = self
            .nodes
            .iter()
            .rev()
            .filter(|n| n.kind == kind)
            .take(GRAPH_FAN_IN)
            .map(|n| n.id)
            .collect();

        let id = self.next_id;
        self.next_id += 1;
        self.nodes.push_back(GraphNode {
            id,
            kind,
            subject,
            timestamp,
            edges,
        });

        while self.nodes.len() > self.capacity {
            self.nodes.pop_front();
        }
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Up to `limit` nodes of `kind`, newest first.
    pub fn query(&self, kind: NodeKind, limit: usize) -> Vec<&GraphNode> {
        self.nodes
            .iter()
            .rev()
            .filter(|n| n.kind == kind)
            .take(limit)
            .collect()
    }

    /// The `limit` newest nodes, newest first.
    pub fn recent(&self, limit: usize) -> Vec<&GraphNode> {
        self.nodes.iter().rev().take(limit).collect()
    }
}

impl Default for EventGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Dashboard view of one proof.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofSummary {
    pub proof_id: Digest,
    pub proof_hash: Digest,
    pub fidelity: f64,
    /// `None` until the proof has been verified.
    pub verified: Option<bool>,
    pub timestamp: i64,
}

/// Dashboard view of one published root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishSummary {
    pub receipt_id: ReceiptId,
    pub merkle_root: Digest,
    pub chains: usize,
    /// `None` while no confirmation wait has resolved.
    pub confirmed: Option<bool>,
    pub timestamp: i64,
}

/// State the scheduler accumulates from pipeline events.
#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    pub proofs: BTreeMap<Digest, ProofSummary>,
    pub publishes: BTreeMap<ReceiptId, PublishSummary>,
    pub graph: EventGraph,
    pub metrics: Option<FidelityMetrics>,
    pub sync_status: Option<SyncStatus>,
    /// Time of the last completed export (Unix ms); 0 before the first.
    pub last_update: i64,
    pub events_applied: u64,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the dashboard.
    pub fn apply(&mut self, event: &PipelineEvent) {
        match event {
            PipelineEvent::ProofSubmitted {
                proof_id,
                proof_hash,
                fidelity,
                timestamp,
            } => {
                self.proofs.insert(
                    *proof_hash,
                    ProofSummary {
                        proof_id: *proof_id,
                        proof_hash: *proof_hash,
                        fidelity: *fidelity,
                        verified: None,
                        timestamp: *timestamp,
                    },
                );
            }
            PipelineEvent::ProofVerified {
                proof_hash, valid, ..
            } => {
                if let Some(summary) = self.proofs.get_mut(proof_hash) {
                    summary.verified = Some(*valid);
                }
            }
            PipelineEvent::RootPublished {
                receipt_id,
                merkle_root,
                chains,
                timestamp,
            } => {
                self.publishes.insert(
                    *receipt_id,
                    PublishSummary {
                        receipt_id: *receipt_id,
                        merkle_root: *merkle_root,
                        chains: *chains,
                        confirmed: None,
                        timestamp: *timestamp,
                    },
                );
            }
            PipelineEvent::ConfirmationResolved {
                receipt_id,
                confirmed,
                ..
            } => {
                if let Some(summary) = self.publishes.get_mut(receipt_id) {
                    summary.confirmed = Some(*confirmed);
                }
            }
        }

        self.graph
            .push(event.kind(), event.subject(), event.timestamp());
        self.events_applied += 1;
    }

    /// Record a periodic sync snapshot.
    pub fn record_sync(
        &mut self,
        view_id: Digest,
        status: SyncStatus,
        metrics: FidelityMetrics,
        now: i64,
    ) {
        self.graph.push(NodeKind::Metric, view_id, now);
        self.sync_status = Some(status);
        self.metrics = Some(metrics);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submitted(n: u8) -> PipelineEvent {
        PipelineEvent::ProofSubmitted {
            proof_id: Digest::hash(&[n, 0]),
            proof_hash: Digest::hash(&[n]),
            fidelity: 0.9991,
            timestamp: n as i64,
        }
    }

    #[test]
    fn test_graph_links_last_three_of_kind() {
        let mut graph = EventGraph::new();
        let a = graph.push(NodeKind::Proof, Digest::hash(b"a"), 1);
        let b = graph.push(NodeKind::Proof, Digest::hash(b"b"), 2);
        graph.push(NodeKind::Publish, Digest::hash(b"p"), 3);
        let c = graph.push(NodeKind::Proof, Digest::hash(b"c"), 4);
        let d = graph.push(NodeKind::Proof, Digest::hash(b"d"), 5);
        let e = graph.push(NodeKind::Proof, Digest::hash(b"e"), 6);

        assert_eq!(graph.get(a).unwrap().edges, Vec::<u64>::new());
        assert_eq!(graph.get(c).unwrap().edges, vec![b, a]);
        assert_eq!(graph.get(e).unwrap().edges, vec![d, c, b]);
        assert_eq!(graph.query(NodeKind::Publish, 10).len(), 1);
    }

    #[test]
    fn test_graph_capacity() {
        let mut graph = EventGraph::new();
        for i in 0..1_200u32 {
            graph.push(NodeKind::Metric, Digest::hash(&i.to_be_bytes()), i as i64);
        }
        assert_eq!(graph.len(), GRAPH_CAPACITY);
        assert!(graph.get(0).is_none());
        assert!(graph.get(1_199).is_some());
        assert_eq!(graph.recent(1)[0].id, 1_199);
    }

    #[test]
    fn test_dashboard_tracks_verification() {
        let mut dashboard = Dashboard::new();
        let event = submitted(1);
        dashboard.apply(&event);
        dashboard.apply(&PipelineEvent::ProofVerified {
            proof_hash: event.subject(),
            valid: true,
            timestamp: 2,
        });

        let summary = &dashboard.proofs[&event.subject()];
        assert_eq!(summary.verified, Some(true));
        assert_eq!(dashboard.graph.len(), 2);
        assert_eq!(dashboard.events_applied, 2);
    }

    #[test]
    fn test_event_wire_format() {
        let json = serde_json::to_value(submitted(3)).unwrap();
        assert_eq!(json["type"], "proof_submitted");
        assert_eq!(json["timestamp"], 3);
    }
}
