//! Merkle commitments over proof hashes.
//!
//! Combination convention:
//! - Leaves are taken as given. Every leaf the crate produces is already a
//!   domain-separated digest (`PROOF_HASH` for proofs, `CHAIN_LEAF` for chain
//!   records), never a `MERKLE_NODE` output.
//! - Plain [`verify_merkle_proof`] cannot tell a leaf from an internal node
//!   presented with a shortened path. [`verify_merkle_inclusion`] also pins
//!   the leaf position and tree size, which rules that out.
//! - A parent is `blake3(NODE_DOMAIN || min(a, b) || max(a, b))`, so the pair
//!   is sorted before hashing and a sibling path needs no direction bits.
//! - An odd node at the end of a level is promoted unchanged.
//! - A single leaf is its own root.
//! - The empty tree has the fixed root `blake3(EMPTY_DOMAIN)`.

use crate::crypto::{domain, Digest};

/// Combine two nodes into their parent.
pub fn hash_pair(a: &Digest, b: &Digest) -> Digest {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    Digest::hash_parts(domain::MERKLE_NODE, &[lo.as_bytes(), hi.as_bytes()])
}

/// Root of the empty tree.
pub fn empty_root() -> Digest {
    Digest::hash(domain::MERKLE_EMPTY)
}

/// A fully materialized Merkle tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    /// `levels[0]` holds the leaves, the last level holds the root.
    levels: Vec<Vec<Digest>>,
}

impl MerkleTree {
    /// Build a tree over leaves in the given order.
    pub fn from_leaves(leaves: Vec<Digest>) -> Self {
        let mut levels = vec![leaves];
        while levels.last().map_or(0, Vec::len) > 1 {
            let current = &levels[levels.len() - 1];
            let next: Vec<Digest> = current
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => hash_pair(left, right),
                    [single] => *single,
                    _ => unreachable!("chunks(2) yields one or two items"),
                })
                .collect();
            levels.push(next);
        }
        Self { levels }
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        self.levels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels[0].is_empty()
    }

    pub fn leaves(&self) -> &[Digest] {
        &self.levels[0]
    }

    /// The committed root.
    pub fn root(&self) -> Digest {
        match self.levels.last() {
            Some(top) if top.len() == 1 => top[0],
            _ => empty_root(),
        }
    }

    /// Sibling path from leaf `index` to the root.
    ///
    /// Levels where the node was promoted contribute no sibling.
    pub fn proof(&self, index: usize) -> Option<Vec<Digest>> {
        if index >= self.len() {
            return None;
        }
        let mut path = Vec::new();
        let mut i = index;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = i ^ 1;
            if let Some(node) = level.get(sibling) {
                path.push(*node);
            }
            i /= 2;
        }
        Some(path)
    }
}

/// Root over `leaves` without keeping the tree.
pub fn merkle_root(leaves: &[Digest]) -> Digest {
    MerkleTree::from_leaves(leaves.to_vec()).root()
}

/// Fold `leaf` through `path` and compare with `root`.
pub fn verify_merkle_proof(leaf: &Digest, path: &[Digest], root: &Digest) -> bool {
    let computed = path
        .iter()
        .fold(*leaf, |acc, sibling| hash_pair(&acc, sibling));
    computed == *root
}

/// Number of siblings on the path of leaf `index` in a tree of `leaf_count`
/// leaves, or `None` when the index is out of range.
pub fn expected_path_len(index: usize, leaf_count: usize) -> Option<usize> {
    if index >= leaf_count {
        return None;
    }
    let (mut i, mut n, mut len) = (index, leaf_count, 0);
    while n > 1 {
        if i ^ 1 < n {
            len += 1;
        }
        i /= 2;
        n = (n + 1) / 2;
    }
    Some(len)
}

/// [`verify_merkle_proof`] for leaf `index` of a tree with `leaf_count` leaves.
///
/// The path must have exactly the length that position implies.
pub fn verify_merkle_inclusion(
    leaf: &Digest,
    index: usize,
    leaf_count: usize,
    path: &[Digest],
    root: &Digest,
) -> bool {
    expected_path_len(index, leaf_count) == Some(path.len())
        && verify_merkle_proof(leaf, path, root)
}

/// Hex-string form of [`verify_merkle_proof`]; malformed input verifies as false.
pub fn verify_merkle_proof_hex(leaf: &str, path: &[String], root: &str) -> bool {
    let parse = |s: &str| Digest::from_hex(s).ok();
    let (Some(leaf), Some(root)) = (parse(leaf), parse(root)) else {
        return false;
    };
    let Some(path) = path.iter().map(|s| parse(s)).collect::<Option<Vec<_>>>() else {
        return false;
    };
    verify_merkle_proof(&leaf, &path, &root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn leaves(n: usize) -> Vec<Digest> {
        (0..n).map(|i| Digest::hash(&(i as u64).to_be_bytes())).collect()
    }

    #[test]
    fn test_empty_tree() {
        let tree = MerkleTree::from_leaves(vec![]);
        assert!(tree.is_empty());
        assert_eq!(tree.root(), empty_root());
        assert_eq!(tree.proof(0), None);
    }

    #[test]
    fn test_single_leaf_is_root() {
        let leaf = Digest::hash(b"only");
        let tree = MerkleTree::from_leaves(vec![leaf]);
        assert_eq!(tree.root(), leaf);
        assert_eq!(tree.proof(0), Some(vec![]));
        assert!(verify_merkle_proof(&leaf, &[], &leaf));
    }

    #[test]
    fn test_pair_is_order_independent() {
        let (a, b) = (Digest::hash(b"a"), Digest::hash(b"b"));
        assert_eq!(hash_pair(&a, &b), hash_pair(&b, &a));
    }

    #[test]
    fn test_odd_node_promoted() {
        let l = leaves(3);
        let tree = MerkleTree::from_leaves(l.clone());
        assert_eq!(tree.root(), hash_pair(&hash_pair(&l[0], &l[1]), &l[2]));
        assert_eq!(tree.proof(2), Some(vec![hash_pair(&l[0], &l[1])]));
    }

    #[test]
    fn test_every_leaf_verifies() {
        for n in 1..=17 {
            let tree = MerkleTree::from_leaves(leaves(n));
            let root = tree.root();
            for (i, leaf) in tree.leaves().iter().enumerate() {
                let path = tree.proof(i).unwrap();
                assert!(verify_merkle_proof(leaf, &path, &root), "n={n} i={i}");
            }
        }
    }

    #[test]
    fn test_wrong_leaf_rejected() {
        let tree = MerkleTree::from_leaves(leaves(8));
        let path = tree.proof(3).unwrap();
        assert!(!verify_merkle_proof(&tree.leaves()[4], &path, &tree.root()));
    }

    #[test]
    fn test_path_len_matches_tree() {
        for n in 1..=33 {
            let tree = MerkleTree::from_leaves(leaves(n));
            for i in 0..n {
                assert_eq!(expected_path_len(i, n), tree.proof(i).map(|p| p.len()), "n={n} i={i}");
            }
            assert_eq!(expected_path_len(n, n), None);
        }
    }

    #[test]
    fn test_internal_node_cannot_pose_as_leaf() {
        let l = leaves(4);
        let tree = MerkleTree::from_leaves(l.clone());
        let root = tree.root();
        let node = hash_pair(&l[0], &l[1]);
        let short_path = vec![hash_pair(&l[2], &l[3])];

        // The bare fold accepts the node; the positional check does not.
        assert!(verify_merkle_proof(&node, &short_path, &root));
        assert!(!verify_merkle_inclusion(&node, 0, 4, &short_path, &root));
        assert!(!verify_merkle_inclusion(&node, 1, 4, &short_path, &root));

        let path = tree.proof(2).unwrap();
        assert!(verify_merkle_inclusion(&l[2], 2, 4, &path, &root));
        assert!(!verify_merkle_inclusion(&l[2], 2, 5, &path, &root));
    }

    #[test]
    fn test_hex_form() {
        let tree = MerkleTree::from_leaves(leaves(4));
        let path: Vec<String> = tree.proof(1).unwrap().iter().map(Digest::to_hex).collect();
        let leaf = tree.leaves()[1].to_hex();
        assert!(verify_merkle_proof_hex(&leaf, &path, &tree.root().to_hex()));
        assert!(!verify_merkle_proof_hex("zz", &path, &tree.root().to_hex()));
        assert!(!verify_merkle_proof_hex(&leaf, &["bad".into()], &tree.root().to_hex()));
    }

    proptest! {
        #[test]
        fn prop_paths_verify_and_corruption_fails(
            n in 1usize..64,
            pick in any::<prop::sample::Index>(),
            byte in 0usize..32,
            flip in 1u8..=255,
        ) {
            let tree = MerkleTree::from_leaves(leaves(n));
            let i = pick.index(n);
            let leaf = tree.leaves()[i];
            let path = tree.proof(i).unwrap();
            let root = tree.root();
            prop_assert!(verify_merkle_proof(&leaf, &path, &root));

            let mut bad_root = root;
            bad_root.0[byte] ^= flip;
            prop_assert!(!verify_merkle_proof(&leaf, &path, &bad_root));

            if !path.is_empty() {
                let mut bad_path = path.clone();
                let k = byte % bad_path.len();
                bad_path[k].0[byte] ^= flip;
                prop_assert!(!verify_merkle_proof(&leaf, &bad_path, &root));
            }
        }
    }
}
