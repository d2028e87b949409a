//! Proof construction, verification, aggregation and recursive chaining.
//!
//! A [`ZkProof`] attests that data with a given hash moved from one vault to
//! another. Only the data hash is committed, never the data. Every proof folds
//! in the digest of a fresh [`EntropyRecord`](crate::entropy::EntropyRecord),
//! so two proofs over identical parameters never share a hash.
//!
//! The proving system sits behind [`ProvingBackend`]. The bundled
//! [`SimulatedGroth16`] backend produces Groth16-shaped payloads without any
//! pairing cryptography; a real backend can be substituted without changing
//! callers.

use std::fmt;
use std::time::{Duration, Instant};

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::canonical::{canonical_params_bytes, canonical_proof_bytes};
use crate::crypto::{domain, Digest};
use crate::entropy::{EntropySource, TARGET_FIDELITY};
use crate::error::{Result, ValidationError};
use crate::merkle::MerkleTree;
use crate::types::now_millis;
use crate::validation::validate_params;

/// Maximum depth of a recursive proof chain.
pub const MAX_RECURSIVE_DEPTH: usize = 10;
/// Generation latency the constructor is expected to stay under.
pub const TARGET_GENERATION_TIME: Duration = Duration::from_millis(500);
/// Verification latency the constructor is expected to stay under.
pub const TARGET_VERIFICATION_TIME: Duration = Duration::from_millis(5);

/// Hash rounds the simulated prover folds the statement through.
const DEFAULT_CONSTRAINTS: u32 = 16_384;

/// Proof system tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProofProtocol {
    Groth16,
}

impl ProofProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Groth16 => "groth16",
        }
    }
}

/// Curve tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Curve {
    Bn128,
}

impl Curve {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bn128 => "bn128",
        }
    }
}

/// Parameters of a vault-to-vault transfer attestation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZkProofParams {
    pub source_vault: String,
    pub target_vault: String,
    /// Hash of the transferred data.
    pub data_hash: Digest,
    /// Transfer time (Unix ms), must be positive.
    pub timestamp: i64,
    /// Entropy digest folded into the proof.
    pub entropy: Option<Digest>,
}

impl ZkProofParams {
    pub fn new(
        source_vault: impl Into<String>,
        target_vault: impl Into<String>,
        data_hash: Digest,
        timestamp: i64,
    ) -> Self {
        Self {
            source_vault: source_vault.into(),
            target_vault: target_vault.into(),
            data_hash,
            timestamp,
            entropy: None,
        }
    }

    /// Build and validate params from a 64-hex data hash.
    pub fn from_hex(
        source_vault: impl Into<String>,
        target_vault: impl Into<String>,
        data_hash: &str,
        timestamp: i64,
    ) -> std::result::Result<Self, ValidationError> {
        let params = Self::new(source_vault, target_vault, Digest::from_hex(data_hash)?, timestamp);
        validate_params(&params)?;
        Ok(params)
    }

    /// Attach a caller-chosen entropy digest.
    pub fn with_entropy(mut self, entropy: Digest) -> Self {
        self.entropy = Some(entropy);
        self
    }
}

/// Groth16-shaped proof elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofPayload {
    pub protocol: ProofProtocol,
    pub curve: Curve,
    pub pi_a: [Digest; 2],
    pub pi_b: [[Digest; 2]; 2],
    pub pi_c: [Digest; 2],
}

impl ProofPayload {
    fn elements(&self) -> impl Iterator<Item = &Digest> {
        self.pi_a
            .iter()
            .chain(self.pi_b.iter().flatten())
            .chain(self.pi_c.iter())
    }
}

/// The seam where a proving system plugs in.
pub trait ProvingBackend: Send + Sync {
    fn protocol(&self) -> ProofProtocol;

    fn curve(&self) -> Curve;

    /// Produce a payload for fully resolved params.
    fn prove(&self, params: &ZkProofParams) -> ProofPayload;

    /// Structural acceptance of a payload for the given params.
    fn accepts(&self, payload: &ProofPayload, params: &ZkProofParams) -> bool;
}

/// Hash-based stand-in for a Groth16 prover.
///
/// Proving folds the statement through a fixed number of hash rounds to model
/// witness computation, then blinds each element with fresh randomness.
/// Acceptance only checks tags and element shape.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedGroth16 {
    constraints: u32,
}

impl SimulatedGroth16 {
    pub fn new(constraints: u32) -> Self {
        Self { constraints }
    }
}

impl Default for SimulatedGroth16 {
    fn default() -> Self {
        Self::new(DEFAULT_CONSTRAINTS)
    }
}

impl ProvingBackend for SimulatedGroth16 {
    fn protocol(&self) -> ProofProtocol {
        ProofProtocol::Groth16
    }

    fn curve(&self) -> Curve {
        Curve::Bn128
    }

    fn prove(&self, params: &ZkProofParams) -> ProofPayload {
        let mut witness = Digest::hash_parts(domain::PROVER, &[&canonical_params_bytes(params)]);
        for round in 0..self.constraints {
            witness = Digest::hash_parts(
                domain::PROVER,
                &[witness.as_bytes(), &round.to_le_bytes()],
            );
        }

        let mut rng = rand::thread_rng();
        let mut index = 0u8;
        let mut element = || {
            index += 1;
            let blinding: [u8; 32] = rng.gen();
            Digest::hash_parts(domain::PROVER, &[witness.as_bytes(), &[index], &blinding])
        };

        ProofPayload {
            protocol: self.protocol(),
            curve: self.curve(),
            pi_a: [element(), element()],
            pi_b: [[element(), element()], [element(), element()]],
            pi_c: [element(), element()],
        }
    }

    fn accepts(&self, payload: &ProofPayload, _params: &ZkProofParams) -> bool {
        payload.protocol == self.protocol()
            && payload.curve == self.curve()
            && payload.elements().all(|e| *e != Digest::ZERO)
    }
}

/// A transfer attestation.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ZkProof {
    pub proof_id: Digest,
    pub proof_hash: Digest,
    /// Effective params, entropy included.
    pub params: ZkProofParams,
    pub payload: ProofPayload,
    pub generation_time: Duration,
    pub quantum_fidelity: f64,
}

impl ZkProof {
    /// Recompute the id from the stored params.
    pub fn compute_id(&self) -> Digest {
        Digest::hash_parts(domain::PROOF_ID, &[&canonical_params_bytes(&self.params)])
    }

    /// Recompute the hash from the stored params and payload.
    pub fn compute_hash(&self) -> Digest {
        Digest::hash_parts(
            domain::PROOF_HASH,
            &[&canonical_proof_bytes(&self.params, &self.payload)],
        )
    }
}

impl fmt::Debug for ZkProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZkProof")
            .field("proof_id", &self.proof_id)
            .field("proof_hash", &self.proof_hash)
            .field("source_vault", &self.params.source_vault)
            .field("target_vault", &self.params.target_vault)
            .field("data_hash", &self.params.data_hash)
            .finish_non_exhaustive()
    }
}

/// Why a proof failed verification.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum VerificationFailure {
    #[error("invalid proof protocol or curve")]
    ProtocolMismatch,

    #[error("invalid proof parameters: {0}")]
    InvalidParams(String),

    #[error("invalid proof structure")]
    MalformedPayload,

    #[error("proof id mismatch")]
    IdMismatch,

    #[error("proof hash mismatch")]
    HashMismatch,
}

/// Outcome of [`ProofConstructor::verify_proof`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofVerification {
    pub valid: bool,
    /// The hash recorded on the proof.
    pub proof_hash: Digest,
    pub verification_time: Duration,
    pub quantum_fidelity: f64,
    pub failure: Option<VerificationFailure>,
}

impl ProofVerification {
    pub fn error_message(&self) -> Option<String> {
        self.failure.as_ref().map(ToString::to_string)
    }
}

/// Many proofs committed under one Merkle root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedProof {
    pub aggregation_id: Digest,
    pub proofs: Vec<ZkProof>,
    pub merkle_root: Digest,
    pub aggregated_proof_hash: Digest,
    pub timestamp: i64,
    pub aggregation_time: Duration,
}

impl AggregatedProof {
    /// Leaves of the tree, in proof order.
    pub fn leaves(&self) -> Vec<Digest> {
        self.proofs.iter().map(|p| p.proof_hash).collect()
    }

    /// Sibling path proving that proof `index` is under the root.
    pub fn inclusion_proof(&self, index: usize) -> Option<Vec<Digest>> {
        MerkleTree::from_leaves(self.leaves()).proof(index)
    }
}

/// A base proof followed by proofs over each previous proof's hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecursiveProof {
    pub depth: usize,
    pub base_proof: ZkProof,
    pub recursive_proofs: Vec<ZkProof>,
    pub final_proof_hash: Digest,
}

impl RecursiveProof {
    fn compute_final_hash(base: &ZkProof, chain: &[ZkProof]) -> Digest {
        let mut hasher = blake3::Hasher::new();
        hasher.update(domain::RECURSIVE);
        hasher.update(base.proof_hash.as_bytes());
        for proof in chain {
            hasher.update(proof.proof_hash.as_bytes());
        }
        Digest(*hasher.finalize().as_bytes())
    }

    /// Whether every level commits to its predecessor and the final hash matches.
    pub fn links_valid(&self) -> bool {
        if self.recursive_proofs.len() != self.depth {
            return false;
        }
        let mut prev = self.base_proof.proof_hash;
        for proof in &self.recursive_proofs {
            if proof.params.data_hash != prev {
                return false;
            }
            prev = proof.proof_hash;
        }
        self.final_proof_hash == Self::compute_final_hash(&self.base_proof, &self.recursive_proofs)
    }
}

/// Targets a caller can assert against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub target_generation_time: Duration,
    pub target_verification_time: Duration,
    pub fidelity_target: f64,
    pub max_recursive_depth: usize,
    pub protocol: ProofProtocol,
    pub curve: Curve,
}

/// Builds and checks proofs.
pub struct ProofConstructor<B: ProvingBackend = SimulatedGroth16> {
    entropy: EntropySource,
    backend: B,
}

impl ProofConstructor<SimulatedGroth16> {
    pub fn new() -> Self {
        Self::with_backend(SimulatedGroth16::default())
    }
}

impl Default for ProofConstructor<SimulatedGroth16> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: ProvingBackend> ProofConstructor<B> {
    pub fn with_backend(backend: B) -> Self {
        Self {
            entropy: EntropySource::new(),
            backend,
        }
    }

    pub fn entropy(&self) -> &EntropySource {
        &self.entropy
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Generate a proof for `params`.
    ///
    /// Params are validated before any entropy is drawn.
    pub fn generate_proof(&self, params: ZkProofParams) -> Result<ZkProof> {
        validate_params(&params)?;
        let start = Instant::now();

        let record = self.entropy.generate_default();
        let drawn = record.digest();
        let entropy = match params.entropy {
            Some(supplied) => Digest::hash_parts(
                domain::ENTROPY_MIX,
                &[supplied.as_bytes(), drawn.as_bytes()],
            ),
            None => drawn,
        };
        let params = ZkProofParams {
            entropy: Some(entropy),
            ..params
        };

        let payload = self.backend.prove(&params);
        let mut proof = ZkProof {
            proof_id: Digest::ZERO,
            proof_hash: Digest::ZERO,
            params,
            payload,
            generation_time: Duration::ZERO,
            quantum_fidelity: record.fidelity,
        };
        proof.proof_id = proof.compute_id();
        proof.proof_hash = proof.compute_hash();
        proof.generation_time = start.elapsed();
        Ok(proof)
    }

    /// Check a proof against its own stored fields.
    ///
    /// Never fails; mismatches are reported in the result.
    pub fn verify_proof(&self, proof: &ZkProof) -> ProofVerification {
        let start = Instant::now();
        let failure = self.check(proof).err();
        ProofVerification {
            valid: failure.is_none(),
            proof_hash: proof.proof_hash,
            verification_time: start.elapsed(),
            quantum_fidelity: proof.quantum_fidelity,
            failure,
        }
    }

    fn check(&self, proof: &ZkProof) -> std::result::Result<(), VerificationFailure> {
        // 1. Tags
        if proof.payload.protocol != self.backend.protocol()
            || proof.payload.curve != self.backend.curve()
        {
            return Err(VerificationFailure::ProtocolMismatch);
        }

        // 2. Params
        validate_params(&proof.params)
            .map_err(|e| VerificationFailure::InvalidParams(e.to_string()))?;
        if proof.params.entropy.is_none() {
            return Err(VerificationFailure::InvalidParams("missing entropy".into()));
        }

        // 3. Payload shape
        if !self.backend.accepts(&proof.payload, &proof.params) {
            return Err(VerificationFailure::MalformedPayload);
        }

        // 4. Id
        if proof.compute_id() != proof.proof_id {
            return Err(VerificationFailure::IdMismatch);
        }

        // 5. Hash
        if proof.compute_hash() != proof.proof_hash {
            return Err(VerificationFailure::HashMismatch);
        }

        Ok(())
    }

    /// Commit to `proofs` under one Merkle root, preserving order.
    pub fn aggregate_proofs(&self, proofs: Vec<ZkProof>) -> AggregatedProof {
        let start = Instant::now();

        let tree = MerkleTree::from_leaves(proofs.iter().map(|p| p.proof_hash).collect());
        let merkle_root = tree.root();

        let mut hasher = blake3::Hasher::new();
        hasher.update(domain::AGGREGATION);
        for proof in &proofs {
            hasher.update(proof.proof_id.as_bytes());
        }
        let aggregation_id = Digest(*hasher.finalize().as_bytes());

        let aggregated_proof_hash = Digest::hash_parts(
            domain::AGGREGATION,
            &[merkle_root.as_bytes(), aggregation_id.as_bytes()],
        );

        AggregatedProof {
            aggregation_id,
            proofs,
            merkle_root,
            aggregated_proof_hash,
            timestamp: now_millis(),
            aggregation_time: start.elapsed(),
        }
    }

    /// Chain `depth` proofs on top of `base`.
    ///
    /// Level `i` attests a move from `recursive_level_{i}` to
    /// `recursive_level_{i+1}` of the previous proof hash.
    pub fn create_recursive_proof(&self, base: &ZkProof, depth: usize) -> Result<RecursiveProof> {
        if depth > MAX_RECURSIVE_DEPTH {
            return Err(ValidationError::DepthExceeded {
                requested: depth,
                max: MAX_RECURSIVE_DEPTH,
            }
            .into());
        }
        if depth == 0 {
            return Err(ValidationError::ZeroDepth.into());
        }

        let mut chain: Vec<ZkProof> = Vec::with_capacity(depth);
        for level in 0..depth {
            let prev = chain.last().unwrap_or(base).proof_hash;
            let params = ZkProofParams::new(
                format!("recursive_level_{level}"),
                format!("recursive_level_{}", level + 1),
                prev,
                now_millis(),
            );
            chain.push(self.generate_proof(params)?);
        }

        let final_proof_hash = RecursiveProof::compute_final_hash(base, &chain);
        Ok(RecursiveProof {
            depth,
            base_proof: base.clone(),
            recursive_proofs: chain,
            final_proof_hash,
        })
    }

    pub fn performance_metrics(&self) -> PerformanceMetrics {
        PerformanceMetrics {
            target_generation_time: TARGET_GENERATION_TIME,
            target_verification_time: TARGET_VERIFICATION_TIME,
            fidelity_target: TARGET_FIDELITY,
            max_recursive_depth: MAX_RECURSIVE_DEPTH,
            protocol: self.backend.protocol(),
            curve: self.backend.curve(),
        }
    }
}
