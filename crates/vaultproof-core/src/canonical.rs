//! Canonical CBOR encoding for deterministic hashing.
//!
//! This module implements RFC 8949 Core Deterministic Encoding:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - Floats encode as 64-bit CBOR (major 7, 0xfb), but no hashed structure
//!   carries one: timestamps are i64 milliseconds and proof fidelity is stored
//!   beside the proof, outside the hashed bytes
//!
//! Proof ids and proof hashes are Blake3 digests over these bytes, so the
//! same stored proof fields always produce the same digests.

use std::collections::BTreeMap;

use ciborium::value::Value;

use crate::crypto::Digest;
use crate::proof::{ProofPayload, ZkProofParams};

/// Field keys (integer keys for compact encoding).
///
/// Keys 0-23 encode as single bytes in CBOR.
mod keys {
    pub const SOURCE_VAULT: u64 = 0;
    pub const TARGET_VAULT: u64 = 1;
    pub const DATA_HASH: u64 = 2;
    pub const TIMESTAMP: u64 = 3;
    pub const ENTROPY: u64 = 4;

    pub const PROTOCOL: u64 = 0;
    pub const CURVE: u64 = 1;
    pub const PI_A: u64 = 2;
    pub const PI_B: u64 = 3;
    pub const PI_C: u64 = 4;
}

/// Encode proof parameters to canonical CBOR bytes.
pub fn canonical_params_bytes(params: &ZkProofParams) -> Vec<u8> {
    encode_cbor_value_canonical(&params_to_cbor_value(params))
}

/// Encode the statement a proof hash commits to.
///
/// Format: CBOR array `[params, payload]`.
pub fn canonical_proof_bytes(params: &ZkProofParams, payload: &ProofPayload) -> Vec<u8> {
    let value = Value::Array(vec![
        params_to_cbor_value(params),
        payload_to_cbor_value(payload),
    ]);
    encode_cbor_value_canonical(&value)
}

/// Encode string metadata as a canonical text-keyed map.
pub fn canonical_metadata_bytes(metadata: &BTreeMap<String, String>) -> Vec<u8> {
    let entries = metadata
        .iter()
        .map(|(k, v)| (Value::Text(k.clone()), Value::Text(v.clone())))
        .collect();
    encode_cbor_value_canonical(&Value::Map(entries))
}

fn digest_value(d: &Digest) -> Value {
    Value::Bytes(d.0.to_vec())
}

fn key(k: u64) -> Value {
    Value::Integer(k.into())
}

/// Convert params to a CBOR Value (map with integer keys).
fn params_to_cbor_value(params: &ZkProofParams) -> Value {
    let entropy = match &params.entropy {
        Some(d) => digest_value(d),
        None => Value::Null,
    };

    Value::Map(vec![
        (key(keys::SOURCE_VAULT), Value::Text(params.source_vault.clone())),
        (key(keys::TARGET_VAULT), Value::Text(params.target_vault.clone())),
        (key(keys::DATA_HASH), digest_value(&params.data_hash)),
        (key(keys::TIMESTAMP), Value::Integer(params.timestamp.into())),
        (key(keys::ENTROPY), entropy),
    ])
}

fn payload_to_cbor_value(payload: &ProofPayload) -> Value {
    let elements = |items: &[Digest]| Value::Array(items.iter().map(digest_value).collect());

    Value::Map(vec![
        (key(keys::PROTOCOL), Value::Text(payload.protocol.as_str().into())),
        (key(keys::CURVE), Value::Text(payload.curve.as_str().into())),
        (key(keys::PI_A), elements(&payload.pi_a)),
        (
            key(keys::PI_B),
            Value::Array(payload.pi_b.iter().map(|row| elements(row)).collect()),
        ),
        (key(keys::PI_C), elements(&payload.pi_c)),
    ])
}

/// Encode a CBOR Value to canonical bytes.
fn encode_cbor_value_canonical(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value);
    buf
}

/// Recursively encode a CBOR value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => {
            encode_uint(buf, 2, b.len() as u64);
            buf.extend_from_slice(b);
        }
        Value::Text(s) => {
            encode_uint(buf, 3, s.len() as u64);
            buf.extend_from_slice(s.as_bytes());
        }
        Value::Array(arr) => {
            encode_uint(buf, 4, arr.len() as u64);
            for item in arr {
                encode_value_to(buf, item);
            }
        }
        Value::Map(entries) => encode_map_canonical(buf, entries),
        Value::Tag(tag, inner) => {
            encode_uint(buf, 6, *tag);
            encode_value_to(buf, inner);
        }
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        Value::Float(f) => {
            buf.push(0xfb);
            buf.extend_from_slice(&f.to_be_bytes());
        }
        // undefined
        _ => buf.push(0xf7),
    }
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: ciborium::value::Integer) {
    let n: i128 = i.into();

    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        encode_uint(buf, 1, (-1 - n) as u64);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a map canonically (major type 5).
///
/// Keys are sorted by their encoded byte comparison.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) {
    let mut pairs: Vec<(Vec<u8>, &Value)> = entries
        .iter()
        .map(|(k, v)| {
            let mut key_buf = Vec::new();
            encode_value_to(&mut key_buf, k);
            (key_buf, v)
        })
        .collect();

    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, pairs.len() as u64);
    for (key_bytes, value) in pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proof::{Curve, ProofProtocol};

    fn params() -> ZkProofParams {
        ZkProofParams {
            source_vault: "vault-a".into(),
            target_vault: "vault-b".into(),
            data_hash: Digest::hash(b"payload"),
            timestamp: 1_736_870_400_000,
            entropy: None,
        }
    }

    fn payload() -> ProofPayload {
        ProofPayload {
            protocol: ProofProtocol::Groth16,
            curve: Curve::Bn128,
            pi_a: [Digest::from_bytes([1; 32]), Digest::from_bytes([2; 32])],
            pi_b: [
                [Digest::from_bytes([3; 32]), Digest::from_bytes([4; 32])],
                [Digest::from_bytes([5; 32]), Digest::from_bytes([6; 32])],
            ],
            pi_c: [Digest::from_bytes([7; 32]), Digest::from_bytes([8; 32])],
        }
    }

    #[test]
    fn test_encode_uint_smallest_form() {
        let mut buf = Vec::new();
        encode_uint(&mut buf, 0, 23);
        assert_eq!(buf, vec![0x17]);

        buf.clear();
        encode_uint(&mut buf, 0, 24);
        assert_eq!(buf, vec![0x18, 24]);

        buf.clear();
        encode_uint(&mut buf, 0, 256);
        assert_eq!(buf, vec![0x19, 0x01, 0x00]);
    }

    #[test]
    fn test_negative_integer() {
        let mut buf = Vec::new();
        encode_integer(&mut buf, (-1i64).into());
        assert_eq!(buf, vec![0x20]);
    }

    #[test]
    fn test_map_keys_sorted() {
        let value = Value::Map(vec![
            (key(3), Value::Null),
            (key(1), Value::Null),
            (key(2), Value::Null),
        ]);
        let bytes = encode_cbor_value_canonical(&value);
        assert_eq!(bytes, vec![0xa3, 0x01, 0xf6, 0x02, 0xf6, 0x03, 0xf6]);
    }

    #[test]
    fn test_float_encodes_as_double() {
        let bytes = encode_cbor_value_canonical(&Value::Float(1.5));
        assert_eq!(bytes, vec![0xfb, 0x3f, 0xf8, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_hashed_encodings_carry_no_floats() {
        let params_bytes = canonical_params_bytes(&params());
        let proof_bytes = canonical_proof_bytes(&params(), &payload());
        for bytes in [params_bytes, proof_bytes] {
            let value: Value = ciborium::de::from_reader(bytes.as_slice()).unwrap();
            assert!(!contains_float(&value));
        }
    }

    fn contains_float(value: &Value) -> bool {
        match value {
            Value::Float(_) => true,
            Value::Array(items) => items.iter().any(contains_float),
            Value::Map(entries) => entries
                .iter()
                .any(|(k, v)| contains_float(k) || contains_float(v)),
            Value::Tag(_, inner) => contains_float(inner),
            _ => false,
        }
    }

    #[test]
    fn test_params_encoding_deterministic() {
        assert_eq!(canonical_params_bytes(&params()), canonical_params_bytes(&params()));
    }

    #[test]
    fn test_entropy_changes_encoding() {
        let mut with_entropy = params();
        with_entropy.entropy = Some(Digest::hash(b"entropy"));
        assert_ne!(
            canonical_params_bytes(&params()),
            canonical_params_bytes(&with_entropy)
        );
    }

    #[test]
    fn test_payload_changes_encoding() {
        let mut other = payload();
        other.pi_c[1] = Digest::ZERO;
        assert_ne!(
            canonical_proof_bytes(&params(), &payload()),
            canonical_proof_bytes(&params(), &other)
        );
    }

    #[test]
    fn test_metadata_order_independent() {
        let mut a = BTreeMap::new();
        a.insert("batch".to_string(), "7".to_string());
        a.insert("origin".to_string(), "eu-west".to_string());
        let b: BTreeMap<_, _> = a.clone().into_iter().rev().collect();
        assert_eq!(canonical_metadata_bytes(&a), canonical_metadata_bytes(&b));
    }
}
