//! Strong identifiers and small shared types.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::Digest;
use crate::error::ValidationError;

/// Identifier of a published Merkle root receipt.
///
/// Derived from the root, the publish timestamp, the per-chain transaction
/// hashes and the caller's metadata.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReceiptId(pub Digest);

impl ReceiptId {
    /// Create a new ReceiptId from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(Digest::from_bytes(bytes))
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, ValidationError> {
        Digest::from_hex(s).map(Self)
    }
}

impl fmt::Debug for ReceiptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReceiptId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl From<Digest> for ReceiptId {
    fn from(digest: Digest) -> Self {
        Self(digest)
    }
}

impl TryFrom<&[u8]> for ReceiptId {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 32] = slice.try_into()?;
        Ok(Self::from_bytes(arr))
    }
}

/// Current wall-clock time in Unix milliseconds.
///
/// A clock set before the epoch reads as 0.
pub fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_id_hex_roundtrip() {
        let id = ReceiptId::from_bytes([0x42; 32]);
        let recovered = ReceiptId::from_hex(&id.to_hex()).unwrap();
        assert_eq!(id, recovered);
    }

    #[test]
    fn test_receipt_id_display() {
        let id = ReceiptId::from_bytes([0xab; 32]);
        assert_eq!(format!("{}", id), "abababababababab");
    }

    #[test]
    fn test_receipt_id_from_slice() {
        let bytes = [7u8; 32];
        let id = ReceiptId::try_from(&bytes[..]).unwrap();
        assert_eq!(id.as_bytes(), &bytes);
        assert!(ReceiptId::try_from(&bytes[..31]).is_err());
    }

    #[test]
    fn test_now_millis_is_recent() {
        // 2024-01-01T00:00:00Z
        assert!(now_millis() > 1_704_067_200_000);
    }
}
