//! Boundary checks applied before any proof work begins.

use crate::error::ValidationError;
use crate::proof::ZkProofParams;

/// Validate proof parameters.
///
/// The data hash is already a typed [`Digest`](crate::Digest), so its
/// 64-hex form was enforced when it was parsed.
pub fn validate_params(params: &ZkProofParams) -> Result<(), ValidationError> {
    // 1. Source vault
    if params.source_vault.trim().is_empty() {
        return Err(ValidationError::EmptySourceVault);
    }

    // 2. Target vault
    if params.target_vault.trim().is_empty() {
        return Err(ValidationError::EmptyTargetVault);
    }

    // 3. Timestamp
    if params.timestamp <= 0 {
        return Err(ValidationError::InvalidTimestamp(params.timestamp));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Digest;

    fn valid() -> ZkProofParams {
        ZkProofParams::new("vault-a", "vault-b", Digest::hash(b"data"), 1)
    }

    #[test]
    fn test_valid_params() {
        assert!(validate_params(&valid()).is_ok());
    }

    #[test]
    fn test_empty_vaults() {
        let mut p = valid();
        p.source_vault = "  ".into();
        assert_eq!(validate_params(&p), Err(ValidationError::EmptySourceVault));

        let mut p = valid();
        p.target_vault = String::new();
        assert_eq!(validate_params(&p), Err(ValidationError::EmptyTargetVault));
    }

    #[test]
    fn test_timestamp_must_be_positive() {
        let mut p = valid();
        p.timestamp = -5;
        assert_eq!(validate_params(&p), Err(ValidationError::InvalidTimestamp(-5)));
    }

    #[test]
    fn test_from_hex_checks_digest() {
        let hash = Digest::hash(b"data").to_hex();
        assert!(ZkProofParams::from_hex("a", "b", &hash, 10).is_ok());
        assert!(matches!(
            ZkProofParams::from_hex("a", "b", &hash[..63], 10),
            Err(ValidationError::InvalidDigest(_))
        ));
        assert!(ZkProofParams::from_hex("a", "b", &hash, 0).is_err());
    }
}
