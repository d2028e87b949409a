//! Golden test vectors for deterministic verification.
//!
//! Params vectors pin the canonical CBOR encoding byte for byte. Merkle
//! vectors pin tree shape; their roots are reported rather than asserted
//! until a second implementation cross-checks them.

use serde::Serialize;

use vaultproof_core::{canonical_params_bytes, Digest, MerkleTree, ZkProofParams};

/// A canonical-encoding vector.
#[derive(Debug, Clone)]
pub struct ParamsVector {
    pub name: &'static str,
    pub source_vault: &'static str,
    pub target_vault: &'static str,
    pub data_hash: [u8; 32],
    pub timestamp: i64,
    pub entropy: Option<[u8; 32]>,
    /// Expected canonical bytes (hex).
    pub expected_canonical: &'static str,
}

impl ParamsVector {
    pub fn params(&self) -> ZkProofParams {
        let params = ZkProofParams::new(
            self.source_vault,
            self.target_vault,
            Digest::from_bytes(self.data_hash),
            self.timestamp,
        );
        match self.entropy {
            Some(e) => params.with_entropy(Digest::from_bytes(e)),
            None => params,
        }
    }
}

/// A Merkle tree vector. Leaf `i` is the Blake3 hash of `leaves[i]`.
#[derive(Debug, Clone)]
pub struct MerkleVector {
    pub name: &'static str,
    pub leaves: &'static [&'static [u8]],
    /// Path length for every leaf, in leaf order.
    pub path_lengths: &'static [usize],
    /// Expected root (hex); empty means report only.
    pub expected_root: &'static str,
}

impl MerkleVector {
    pub fn leaf_digests(&self) -> Vec<Digest> {
        self.leaves.iter().map(|l| Digest::hash(l)).collect()
    }
}

pub fn params_vectors() -> Vec<ParamsVector> {
    vec![
        ParamsVector {
            name: "basic transfer without entropy",
            source_vault: "vault-a",
            target_vault: "vault-b",
            data_hash: [0x11; 32],
            timestamp: 1_700_000_000_000,
            entropy: None,
            expected_canonical: "a500677661756c742d6101677661756c742d62025820\
                1111111111111111111111111111111111111111111111111111111111111111\
                031b0000018bcfe5680004f6",
        },
        ParamsVector {
            name: "supplied entropy and one-byte timestamp",
            source_vault: "treasury",
            target_vault: "cold-storage",
            data_hash: [0x00; 32],
            timestamp: 1,
            entropy: Some([0xAB; 32]),
            expected_canonical: "a500687472656173757279016c636f6c642d73746f72616765025820\
                0000000000000000000000000000000000000000000000000000000000000000\
                0301045820abababababababababababababababababababababababababababababababab",
        },
        ParamsVector {
            name: "single-character vaults",
            source_vault: "v",
            target_vault: "w",
            data_hash: [
                0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c,
                0x0d, 0x0e, 0x0f, 0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19,
                0x1a, 0x1b, 0x1c, 0x1d, 0x1e, 0x1f,
            ],
            timestamp: 1_736_870_400_000, // 2025-01-14T16:00:00Z
            entropy: None,
            expected_canonical: "a5006176016177025820\
                000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f\
                031b00000194658b100004f6",
        },
    ]
}

pub fn merkle_vectors() -> Vec<MerkleVector> {
    vec![
        MerkleVector {
            name: "empty tree",
            leaves: &[],
            path_lengths: &[],
            expected_root: "",
        },
        MerkleVector {
            name: "single leaf is its own root",
            leaves: &[b"only"],
            path_lengths: &[0],
            expected_root: "",
        },
        MerkleVector {
            name: "balanced four leaves",
            leaves: &[b"a", b"b", b"c", b"d"],
            path_lengths: &[2, 2, 2, 2],
            expected_root: "",
        },
        MerkleVector {
            name: "odd leaf promoted",
            leaves: &[b"a", b"b", b"c", b"d", b"e"],
            path_lengths: &[3, 3, 3, 3, 1],
            expected_root: "",
        },
    ]
}

/// Outcome of checking one vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VectorReport {
    pub name: String,
    pub matches: bool,
    /// The computed value (hex).
    pub actual: String,
}

/// Check every vector against this implementation.
pub fn verify_all_vectors() -> Vec<VectorReport> {
    let params = params_vectors().into_iter().map(|v| {
        let actual = hex::encode(canonical_params_bytes(&v.params()));
        VectorReport {
            name: v.name.to_string(),
            matches: actual == v.expected_canonical,
            actual,
        }
    });

    let merkle = merkle_vectors().into_iter().map(|v| {
        let tree = MerkleTree::from_leaves(v.leaf_digests());
        let shape_ok = (0..tree.len())
            .map(|i| tree.proof(i).map_or(usize::MAX, |p| p.len()))
            .eq(v.path_lengths.iter().copied());
        let actual = tree.root().to_hex();
        VectorReport {
            name: v.name.to_string(),
            matches: shape_ok && (v.expected_root.is_empty() || actual == v.expected_root),
            actual,
        }
    });

    params.chain(merkle).collect()
}

/// Vector reports as pretty JSON, for diffing against another implementation.
pub fn vectors_json() -> serde_json::Result<String> {
    serde_json::to_string_pretty(&verify_all_vectors())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultproof_core::{merkle_root, verify_merkle_proof};

    #[test]
    fn test_all_vectors_match() {
        for report in verify_all_vectors() {
            assert!(report.matches, "vector '{}' produced {}", report.name, report.actual);
        }
    }

    #[test]
    fn test_params_hex_decodes() {
        for vector in params_vectors() {
            let expected = hex::decode(vector.expected_canonical).unwrap();
            assert_eq!(canonical_params_bytes(&vector.params()), expected, "{}", vector.name);
        }
    }

    #[test]
    fn test_merkle_vectors_prove_every_leaf() {
        for vector in merkle_vectors() {
            let leaves = vector.leaf_digests();
            let tree = MerkleTree::from_leaves(leaves.clone());
            assert_eq!(tree.root(), merkle_root(&leaves));
            for (i, leaf) in leaves.iter().enumerate() {
                let path = tree.proof(i).unwrap();
                assert!(verify_merkle_proof(leaf, &path, &tree.root()), "{}", vector.name);
            }
        }
    }

    #[test]
    fn test_single_leaf_root() {
        let leaf = Digest::hash(b"only");
        assert_eq!(merkle_root(&[leaf]), leaf);
    }

    #[test]
    fn test_json_lists_every_vector() {
        let json: serde_json::Value = serde_json::from_str(&vectors_json().unwrap()).unwrap();
        let total = params_vectors().len() + merkle_vectors().len();
        assert_eq!(json.as_array().unwrap().len(), total);
    }
}
