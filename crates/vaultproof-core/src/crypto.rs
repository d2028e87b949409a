//! Hashing primitives for Vaultproof.
//!
//! Every commitment in the pipeline is a 32-byte Blake3 digest. Distinct
//! commitment kinds are separated by a domain prefix so that a proof hash can
//! never be confused with a Merkle node or an entropy id.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Domain prefixes for every digest the pipeline derives.
pub mod domain {
    pub const ENTROPY_ID: &[u8] = b"vaultproof-entropy-id-v0:";
    pub const ENTROPY_DIGEST: &[u8] = b"vaultproof-entropy-v0:";
    pub const ENTROPY_MIX: &[u8] = b"vaultproof-entropy-mix-v0:";
    pub const VALIDATION_ID: &[u8] = b"vaultproof-validation-v0:";
    pub const PROOF_ID: &[u8] = b"vaultproof-proof-id-v0:";
    pub const PROOF_HASH: &[u8] = b"vaultproof-proof-v0:";
    pub const PROVER: &[u8] = b"vaultproof-prover-v0:";
    pub const AGGREGATION: &[u8] = b"vaultproof-aggregate-v0:";
    pub const RECURSIVE: &[u8] = b"vaultproof-recursive-v0:";
    pub const MERKLE_NODE: &[u8] = b"vaultproof-merkle-node-v0:";
    pub const MERKLE_EMPTY: &[u8] = b"vaultproof-merkle-empty-v0";
    pub const CHAIN_LEAF: &[u8] = b"vaultproof-chain-leaf-v0:";
    pub const RECEIPT_ID: &[u8] = b"vaultproof-receipt-v0:";
    pub const CHAIN_TX: &[u8] = b"vaultproof-chain-tx-v0:";
    pub const CHAIN_BLOCK: &[u8] = b"vaultproof-chain-block-v0:";
    pub const LEDGER_ENTRY: &[u8] = b"vaultproof-ledger-entry-v0:";
    pub const LEDGER_VIEW: &[u8] = b"vaultproof-ledger-view-v0:";
}

/// A 32-byte Blake3 digest, rendered as 64 lowercase hex characters.
///
/// Serializes as its hex string.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Digest(pub [u8; 32]);

impl Digest {
    /// Compute the Blake3 hash of the given data.
    pub fn hash(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Hash a sequence of parts under a domain prefix.
    pub fn hash_parts(domain: &[u8], parts: &[&[u8]]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(domain);
        for part in parts {
            hasher.update(part);
        }
        Self(*hasher.finalize().as_bytes())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, ValidationError> {
        if s.len() != 64 {
            return Err(ValidationError::InvalidDigest(s.to_string()));
        }
        let bytes = hex::decode(s).map_err(|_| ValidationError::InvalidDigest(s.to_string()))?;
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// The zero digest (sentinel value).
    pub const ZERO: Self = Self([0u8; 32]);
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Digest {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Digest {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_hex_roundtrip() {
        let d = Digest::hash(b"vault transfer");
        let hex = d.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(Digest::from_hex(&hex).unwrap(), d);
    }

    #[test]
    fn test_from_hex_rejects_bad_input() {
        assert!(Digest::from_hex("abc").is_err());
        assert!(Digest::from_hex(&"zz".repeat(32)).is_err());
        assert!(Digest::from_hex(&"ab".repeat(33)).is_err());
    }

    #[test]
    fn test_domains_separate() {
        let a = Digest::hash_parts(domain::PROOF_ID, &[b"x"]);
        let b = Digest::hash_parts(domain::PROOF_HASH, &[b"x"]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_parts_concatenates() {
        let split = Digest::hash_parts(b"d:", &[b"ab", b"cd"]);
        let joined = Digest::hash_parts(b"d:", &[b"abcd"]);
        assert_eq!(split, joined);
    }

    #[test]
    fn test_serde_as_hex() {
        let d = Digest::from_bytes([0x0f; 32]);
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, format!("\"{}\"", "0f".repeat(32)));
        let back: Digest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
        assert!(serde_json::from_str::<Digest>("\"0f\"").is_err());
    }

    #[test]
    fn test_debug_is_truncated() {
        let d = Digest::from_bytes([0xab; 32]);
        assert_eq!(format!("{:?}", d), "Digest(abababababababab)");
    }
}
