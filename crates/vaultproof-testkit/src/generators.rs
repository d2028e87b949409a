//! Proptest generators for property-based testing.

use proptest::prelude::*;

use vaultproof_core::{Chain, Digest, ProofConstructor, ReceiptId, ZkProof, ZkProofParams};

/// Generate a random Digest.
pub fn digest() -> impl Strategy<Value = Digest> {
    any::<[u8; 32]>().prop_map(Digest::from_bytes)
}

pub fn receipt_id() -> impl Strategy<Value = ReceiptId> {
    digest().prop_map(ReceiptId)
}

/// Generate a vault name.
pub fn vault_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,31}".prop_map(String::from)
}

/// Generate a valid (strictly positive) Unix-ms timestamp.
pub fn timestamp() -> impl Strategy<Value = i64> {
    1i64..=4_102_444_800_000i64
}

pub fn chain() -> impl Strategy<Value = Chain> {
    prop_oneof![
        Just(Chain::Ethereum),
        Just(Chain::Polygon),
        Just(Chain::Solana),
    ]
}

/// Generate a list of Merkle leaves.
pub fn leaves(max_len: usize) -> impl Strategy<Value = Vec<Digest>> {
    prop::collection::vec(digest(), 0..=max_len)
}

/// Inputs for generating proof params.
#[derive(Debug, Clone)]
pub struct ProofParamsInput {
    pub source_vault: String,
    pub target_vault: String,
    pub data_hash: Digest,
    pub timestamp: i64,
    pub entropy: Option<Digest>,
}

impl Arbitrary for ProofParamsInput {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            vault_name(),
            vault_name(),
            digest(),
            timestamp(),
            proptest::option::of(digest()),
        )
            .prop_map(|(source, target, data_hash, ts, entropy)| ProofParamsInput {
                source_vault: source,
                target_vault: target,
                data_hash,
                timestamp: ts,
                entropy,
            })
            .boxed()
    }
}

/// Build params from generated input.
pub fn params_from_input(input: &ProofParamsInput) -> ZkProofParams {
    let params = ZkProofParams::new(
        input.source_vault.clone(),
        input.target_vault.clone(),
        input.data_hash,
        input.timestamp,
    );
    match input.entropy {
        Some(entropy) => params.with_entropy(entropy),
        None => params,
    }
}

/// Generate a proof from generated input.
pub fn proof_from_input(constructor: &ProofConstructor, input: &ProofParamsInput) -> ZkProof {
    constructor
        .generate_proof(params_from_input(input))
        .expect("generated params are valid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultproof_core::{canonical_params_bytes, verify_merkle_proof, MerkleTree};

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn test_canonical_params_deterministic(input: ProofParamsInput) {
            let p1 = params_from_input(&input);
            let p2 = params_from_input(&input);
            prop_assert_eq!(canonical_params_bytes(&p1), canonical_params_bytes(&p2));
        }

        #[test]
        fn test_generated_proofs_verify(input: ProofParamsInput) {
            let constructor = ProofConstructor::new();
            let proof = proof_from_input(&constructor, &input);
            prop_assert!(constructor.verify_proof(&proof).valid);
            prop_assert_eq!(&proof.params.source_vault, &input.source_vault);
        }

        #[test]
        fn test_every_leaf_proves_inclusion(leaves in leaves(40)) {
            let tree = MerkleTree::from_leaves(leaves.clone());
            let root = tree.root();
            for (i, leaf) in leaves.iter().enumerate() {
                let path = tree.proof(i).unwrap();
                prop_assert!(verify_merkle_proof(leaf, &path, &root));
            }
        }

        #[test]
        fn test_foreign_leaf_rejected(leaves in leaves(16), foreign in digest()) {
            prop_assume!(!leaves.is_empty() && !leaves.contains(&foreign));
            let tree = MerkleTree::from_leaves(leaves);
            let path = tree.proof(0).unwrap();
            prop_assert!(!verify_merkle_proof(&foreign, &path, &tree.root()));
        }

        #[test]
        fn test_distinct_data_distinct_params(a in digest(), b in digest()) {
            prop_assume!(a != b);
            let p1 = ZkProofParams::new("src", "dst", a, 1);
            let p2 = ZkProofParams::new("src", "dst", b, 1);
            prop_assert_ne!(canonical_params_bytes(&p1), canonical_params_bytes(&p2));
        }
    }
}
