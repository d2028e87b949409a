//! Entropy and fidelity source.
//!
//! Simulates a 50-qubit register: every qubit passes through a Hadamard gate
//! and is measured, so each readout is a fair coin flip perturbed only by a
//! small readout error. The simulated state fidelity tags every record so the
//! proof layer can report how "clean" the randomness was.
//!
//! Nothing here touches real hardware. The only failure mode of
//! [`EntropySource::generate_entropy`] is a capacity or shape check, and it is
//! rejected before any randomness is drawn.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use bytes::Bytes;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::crypto::{domain, Digest};
use crate::error::{CoreError, Result, ValidationError};
use crate::types::now_millis;

/// Qubits available on the simulated register.
pub const QUBIT_COUNT: u32 = 50;
/// Measurements taken when the caller does not choose.
pub const DEFAULT_MEASUREMENTS: u32 = 256;
/// Fidelity a validation must reach to count as validated.
pub const TARGET_FIDELITY: f64 = 0.9997;
/// Register decoherence time in microseconds.
pub const DECOHERENCE_TIME_US: f64 = 100.0;
/// Single gate operation time in nanoseconds.
pub const GATE_OPERATION_TIME_NS: f64 = 50.0;

pub const TARGET_SINGLE_QUBIT_FIDELITY: f64 = 0.9995;
pub const TARGET_TWO_QUBIT_FIDELITY: f64 = 0.9950;
pub const TARGET_MEASUREMENT_FIDELITY: f64 = 0.9990;
pub const TARGET_STATE_PREP_FIDELITY: f64 = 0.9985;
pub const TARGET_OVERALL_FIDELITY: f64 = 0.9970;

/// Lowest fidelity an entropy record may report.
pub const FIDELITY_FLOOR: f64 = 0.9950;
/// Highest fidelity an entropy record may report.
pub const FIDELITY_CEILING: f64 = 0.9999;

/// Probability that a readout flips the measured bit.
const READOUT_ERROR: f64 = 0.001;
/// Upper bound of the per-gate infidelity drawn for each Hadamard.
const GATE_NOISE: f64 = 0.0001;
/// Physical qubits per logical qubit in the surface code.
const SURFACE_CODE_RATIO: u32 = 10;
/// Physical error rate at which the surface code stops helping.
const SURFACE_CODE_THRESHOLD: f64 = 0.01;
/// Mean absolute difference of two independent uniform bytes.
const EXPECTED_BYTE_DISTANCE: f64 = 256.0 / 3.0;

/// One draw from the simulated register.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntropyRecord {
    /// Unique identifier of this draw.
    pub id: Digest,
    /// Qubits used for the draw.
    pub qubits: u32,
    /// Number of measured bits.
    pub measurements: u32,
    /// Measured bits, packed LSB-first, hex-encoded on the wire.
    #[serde(with = "hex::serde")]
    pub bits: Vec<u8>,
    /// Simulated state fidelity, within [`FIDELITY_FLOOR`, `FIDELITY_CEILING`].
    pub fidelity: f64,
    /// Remaining coherence time in microseconds.
    pub coherence_time_us: f64,
    /// Draw time (Unix ms).
    pub timestamp: i64,
}

impl EntropyRecord {
    /// Hex rendering of the measured bits.
    pub fn bits_hex(&self) -> String {
        hex::encode(&self.bits)
    }

    /// Digest committing to this record, folded into proofs.
    pub fn digest(&self) -> Digest {
        Digest::hash_parts(domain::ENTROPY_DIGEST, &[self.id.as_bytes(), &self.bits])
    }

    /// Fraction of measured bits that read as 1.
    pub fn set_bit_fraction(&self) -> f64 {
        if self.measurements == 0 {
            return 0.0;
        }
        count_set_bits(&self.bits, self.measurements as usize) as f64 / self.measurements as f64
    }

    /// Ratio of distinct byte values to the number of bytes that could be distinct.
    pub fn uniqueness_ratio(&self) -> f64 {
        uniqueness_score(&self.bits)
    }
}

/// Input to [`EntropySource::validate_data`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataInput {
    /// Raw bytes, hashed before validation.
    Raw(Bytes),
    /// A precomputed digest, used as is.
    Digest(Digest),
}

impl DataInput {
    /// Parse a precomputed 64-hex digest.
    pub fn from_hex(s: &str) -> std::result::Result<Self, ValidationError> {
        Digest::from_hex(s).map(Self::Digest)
    }

    /// The digest this input validates.
    pub fn digest(&self) -> Digest {
        match self {
            Self::Raw(bytes) => Digest::hash(bytes),
            Self::Digest(d) => *d,
        }
    }
}

impl From<&[u8]> for DataInput {
    fn from(bytes: &[u8]) -> Self {
        Self::Raw(Bytes::copy_from_slice(bytes))
    }
}

impl From<Vec<u8>> for DataInput {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Raw(Bytes::from(bytes))
    }
}

impl From<Digest> for DataInput {
    fn from(digest: Digest) -> Self {
        Self::Digest(digest)
    }
}

/// Result of validating one piece of data against fresh entropy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantumValidation {
    pub validation_id: Digest,
    pub data_hash: Digest,
    pub entropy: EntropyRecord,
    pub fidelity_score: f64,
    pub validated: bool,
    pub error_rate: f64,
    pub validation_time: Duration,
}

/// Per-operation-class fidelities from a simulated benchmarking run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FidelityMetrics {
    pub single_qubit: f64,
    pub two_qubit: f64,
    pub measurement: f64,
    pub state_prep: f64,
    /// Geometric mean of the four operation classes.
    pub overall: f64,
    pub decoherence_time_us: f64,
    pub gate_operation_time_ns: f64,
}

impl FidelityMetrics {
    /// Whether every class clears its published target.
    pub fn meets_targets(&self) -> bool {
        self.single_qubit >= TARGET_SINGLE_QUBIT_FIDELITY
            && self.two_qubit >= TARGET_TWO_QUBIT_FIDELITY
            && self.measurement >= TARGET_MEASUREMENT_FIDELITY
            && self.state_prep >= TARGET_STATE_PREP_FIDELITY
            && self.overall >= TARGET_OVERALL_FIDELITY
    }
}

/// Outcome of encoding physical qubits into surface-code logical qubits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorCorrection {
    pub physical_qubits: u32,
    pub logical_qubits: u32,
    pub physical_error_rate: f64,
    pub logical_error_rate: f64,
}

/// Fixed descriptor of the simulated hardware.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantumSpecs {
    pub qubit_count: u32,
    pub target_fidelity: f64,
    pub decoherence_time_us: f64,
    pub gate_operation_time_ns: f64,
    pub target_single_qubit_fidelity: f64,
    pub target_two_qubit_fidelity: f64,
    pub target_measurement_fidelity: f64,
    pub target_state_prep_fidelity: f64,
}

/// Source of simulated quantum entropy.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntropySource;

impl EntropySource {
    pub fn new() -> Self {
        Self
    }

    /// Draw entropy from `qubits` qubits over `measurements` readouts.
    pub fn generate_entropy(&self, qubits: u32, measurements: u32) -> Result<EntropyRecord> {
        if qubits > QUBIT_COUNT {
            return Err(CoreError::Capacity {
                requested: qubits,
                available: QUBIT_COUNT,
            });
        }
        if qubits == 0 {
            return Err(ValidationError::ZeroQubits.into());
        }
        if measurements == 0 {
            return Err(ValidationError::ZeroMeasurements.into());
        }
        Ok(self.draw(qubits, measurements))
    }

    /// Draw entropy with the full register and the default measurement count.
    pub fn generate_default(&self) -> EntropyRecord {
        self.draw(QUBIT_COUNT, DEFAULT_MEASUREMENTS)
    }

    /// `count` uniform values in [0, 1].
    pub fn generate_random_numbers(&self, count: usize) -> Vec<f64> {
        let mut rng = rand::thread_rng();
        let bits = measure_bits(&mut rng, count * 8);
        bits.iter().map(|b| *b as f64 / 255.0).collect()
    }

    /// Validate data against a fresh entropy draw.
    pub fn validate_data(&self, input: &DataInput) -> QuantumValidation {
        let start = Instant::now();
        let data_hash = input.digest();
        let entropy = self.generate_default();

        let quality = entropy_quality(&entropy.bits, entropy.measurements as usize);
        let fidelity_score = (entropy.fidelity * quality).clamp(0.0, 1.0);
        let validation_id = Digest::hash_parts(
            domain::VALIDATION_ID,
            &[data_hash.as_bytes(), entropy.id.as_bytes()],
        );

        QuantumValidation {
            validation_id,
            data_hash,
            entropy,
            fidelity_score,
            validated: meets_target(fidelity_score),
            error_rate: 1.0 - fidelity_score,
            validation_time: start.elapsed(),
        }
    }

    /// Validate every item, preserving input order.
    pub fn batch_validate(&self, items: &[DataInput]) -> Vec<QuantumValidation> {
        items.iter().map(|item| self.validate_data(item)).collect()
    }

    /// Run a simulated benchmarking pass over each operation class.
    pub fn fidelity_metrics(&self) -> FidelityMetrics {
        let mut rng = rand::thread_rng();
        let mut sample = |target: f64| target + rng.gen::<f64>() * (FIDELITY_CEILING - target);

        let single_qubit = sample(TARGET_SINGLE_QUBIT_FIDELITY);
        let two_qubit = sample(TARGET_TWO_QUBIT_FIDELITY);
        let measurement = sample(TARGET_MEASUREMENT_FIDELITY);
        let state_prep = sample(TARGET_STATE_PREP_FIDELITY);
        let overall = (single_qubit * two_qubit * measurement * state_prep).powf(0.25);

        FidelityMetrics {
            single_qubit,
            two_qubit,
            measurement,
            state_prep,
            overall,
            decoherence_time_us: DECOHERENCE_TIME_US,
            gate_operation_time_ns: GATE_OPERATION_TIME_NS,
        }
    }

    fn draw(&self, qubits: u32, measurements: u32) -> EntropyRecord {
        let mut rng = rand::thread_rng();

        // Hadamard layer: each gate costs a sliver of state fidelity.
        let mut fidelity = 1.0;
        for _ in 0..qubits {
            fidelity *= 1.0 - rng.gen::<f64>() * GATE_NOISE;
        }
        let fidelity = fidelity.clamp(FIDELITY_FLOOR, FIDELITY_CEILING);

        let bits = measure_bits(&mut rng, measurements as usize);
        let timestamp = now_millis();
        let nonce: [u8; 16] = rng.gen();
        let id = Digest::hash_parts(
            domain::ENTROPY_ID,
            &[&bits, &timestamp.to_be_bytes(), &nonce],
        );

        let coherence = 1.0 - measurements as f64 / 10_000.0;

        EntropyRecord {
            id,
            qubits,
            measurements,
            bits,
            fidelity,
            coherence_time_us: DECOHERENCE_TIME_US * coherence.max(0.0),
            timestamp,
        }
    }
}

/// Encode physical qubits at a fixed 10:1 ratio.
pub fn apply_error_correction(
    physical_qubits: u32,
) -> std::result::Result<ErrorCorrection, ValidationError> {
    let logical_qubits = physical_qubits / SURFACE_CODE_RATIO;
    if logical_qubits == 0 {
        return Err(ValidationError::InsufficientQubits {
            physical: physical_qubits,
            ratio: SURFACE_CODE_RATIO,
        });
    }
    let physical_error_rate = 1.0 - TARGET_FIDELITY;
    Ok(ErrorCorrection {
        physical_qubits,
        logical_qubits,
        physical_error_rate,
        logical_error_rate: physical_error_rate.powi(2) / logical_qubits as f64,
    })
}

/// Logical error rate of a distance-`d` surface code.
///
/// Decreases with distance while the physical error rate stays below the
/// code threshold.
pub fn estimate_logical_error_rate(physical_fidelity: f64, code_distance: u32) -> f64 {
    let p = (1.0 - physical_fidelity).max(0.0);
    (p / SURFACE_CODE_THRESHOLD).powf((code_distance as f64 + 1.0) / 2.0)
}

/// Whether a score clears [`TARGET_FIDELITY`].
pub fn meets_target(score: f64) -> bool {
    score >= TARGET_FIDELITY
}

/// Fixed hardware descriptor.
pub fn specs() -> QuantumSpecs {
    QuantumSpecs {
        qubit_count: QUBIT_COUNT,
        target_fidelity: TARGET_FIDELITY,
        decoherence_time_us: DECOHERENCE_TIME_US,
        gate_operation_time_ns: GATE_OPERATION_TIME_NS,
        target_single_qubit_fidelity: TARGET_SINGLE_QUBIT_FIDELITY,
        target_two_qubit_fidelity: TARGET_TWO_QUBIT_FIDELITY,
        target_measurement_fidelity: TARGET_MEASUREMENT_FIDELITY,
        target_state_prep_fidelity: TARGET_STATE_PREP_FIDELITY,
    }
}

/// Measure `count` Hadamard-prepared qubits, packing results LSB-first.
fn measure_bits<R: Rng>(rng: &mut R, count: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; count.div_ceil(8)];
    for m in 0..count {
        let mut bit = rng.gen_bool(0.5);
        if rng.gen_bool(READOUT_ERROR) {
            bit = !bit;
        }
        if bit {
            bytes[m / 8] |= 1 << (m % 8);
        }
    }
    bytes
}

fn count_set_bits(bytes: &[u8], measured: usize) -> usize {
    (0..measured)
        .filter(|m| bytes.get(m / 8).is_some_and(|b| b & (1 << (m % 8)) != 0))
        .count()
}

/// Mean of the distribution, uniqueness and correlation scores.
fn entropy_quality(bytes: &[u8], measured: usize) -> f64 {
    let distribution = if measured == 0 {
        0.0
    } else {
        let ones = count_set_bits(bytes, measured) as f64 / measured as f64;
        1.0 - 2.0 * (ones - 0.5).abs()
    };

    let correlation = if bytes.len() < 2 {
        1.0
    } else {
        let total: f64 = bytes
            .windows(2)
            .map(|w| (w[0] as f64 - w[1] as f64).abs())
            .sum();
        let mean = total / (bytes.len() - 1) as f64;
        (mean / EXPECTED_BYTE_DISTANCE).min(1.0)
    };

    (distribution + uniqueness_score(bytes) + correlation) / 3.0
}

fn uniqueness_score(bytes: &[u8]) -> f64 {
    if bytes.is_empty() {
        return 0.0;
    }
    let unique: HashSet<u8> = bytes.iter().copied().collect();
    unique.len() as f64 / bytes.len().min(256) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_rejected() {
        let source = EntropySource::new();
        let err = source.generate_entropy(51, 256).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Capacity {
                requested: 51,
                available: 50
            }
        ));
        assert!(source.generate_entropy(50, 256).is_ok());
    }

    #[test]
    fn test_zero_shapes_rejected() {
        let source = EntropySource::new();
        assert!(matches!(
            source.generate_entropy(0, 256),
            Err(CoreError::Validation(ValidationError::ZeroQubits))
        ));
        assert!(matches!(
            source.generate_entropy(8, 0),
            Err(CoreError::Validation(ValidationError::ZeroMeasurements))
        ));
    }

    #[test]
    fn test_record_shape() {
        let record = EntropySource::new().generate_entropy(50, 256).unwrap();
        assert_eq!(record.bits.len(), 32);
        assert_eq!(record.bits_hex().len(), 64);
        assert!(record.fidelity >= FIDELITY_FLOOR && record.fidelity <= FIDELITY_CEILING);
        assert!((record.coherence_time_us - 100.0 * (1.0 - 256.0 / 10_000.0)).abs() < 1e-9);
    }

    #[test]
    fn test_bits_serialize_as_hex() {
        let record = EntropySource::new().generate_entropy(8, 16).unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["bits"], serde_json::Value::String(record.bits_hex()));
    }

    #[test]
    fn test_draws_are_unique() {
        let source = EntropySource::new();
        let a = source.generate_default();
        let b = source.generate_default();
        assert_ne!(a.id, b.id);
        assert_ne!(a.bits, b.bits);
    }

    #[test]
    fn test_set_bit_fraction_is_balanced() {
        let record = EntropySource::new().generate_entropy(50, 1000).unwrap();
        let fraction = record.set_bit_fraction();
        assert!((0.45..=0.55).contains(&fraction), "fraction {fraction}");
    }

    #[test]
    fn test_uniqueness_ratio_over_large_sample() {
        let record = EntropySource::new().generate_entropy(50, 2048).unwrap();
        assert!(record.uniqueness_ratio() > 0.5);
    }

    #[test]
    fn test_random_numbers_count_and_range() {
        let source = EntropySource::new();
        let values = source.generate_random_numbers(100);
        assert_eq!(values.len(), 100);
        assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(source.generate_random_numbers(0).is_empty());
    }

    #[test]
    fn test_random_numbers_mean() {
        let source = EntropySource::new();
        let sum: f64 = (0..1000)
            .map(|_| source.generate_random_numbers(1)[0])
            .sum();
        let mean = sum / 1000.0;
        assert!((0.4..=0.6).contains(&mean), "mean {mean}");
    }

    #[test]
    fn test_validate_raw_and_digest_agree_on_hash() {
        let source = EntropySource::new();
        let raw = DataInput::from(&b"ledger batch 7"[..]);
        let digest = DataInput::from(Digest::hash(b"ledger batch 7"));

        let a = source.validate_data(&raw);
        let b = source.validate_data(&digest);
        assert_eq!(a.data_hash, b.data_hash);
        assert_ne!(a.validation_id, b.validation_id);
    }

    #[test]
    fn test_validate_flags_follow_score() {
        let v = EntropySource::new().validate_data(&DataInput::from(vec![1, 2, 3]));
        assert_eq!(v.validated, v.fidelity_score >= TARGET_FIDELITY);
        assert!((v.error_rate - (1.0 - v.fidelity_score)).abs() < 1e-12);
        assert!(v.validation_time < Duration::from_millis(100));
    }

    #[test]
    fn test_data_input_from_hex() {
        let d = Digest::hash(b"x");
        assert_eq!(DataInput::from_hex(&d.to_hex()).unwrap(), DataInput::Digest(d));
        assert!(DataInput::from_hex("not-hex").is_err());
    }

    #[test]
    fn test_batch_preserves_order() {
        let items: Vec<DataInput> = (0..50u8).map(|i| DataInput::from(vec![i])).collect();
        let results = EntropySource::new().batch_validate(&items);
        assert_eq!(results.len(), 50);
        for (item, result) in items.iter().zip(&results) {
            assert_eq!(item.digest(), result.data_hash);
        }
    }

    #[test]
    fn test_fidelity_metrics_meet_targets() {
        for _ in 0..20 {
            let m = EntropySource::new().fidelity_metrics();
            assert!(m.meets_targets(), "{m:?}");
            assert_eq!(m.decoherence_time_us, 100.0);
            assert_eq!(m.gate_operation_time_ns, 50.0);
        }
    }

    #[test]
    fn test_error_correction() {
        let ec = apply_error_correction(50).unwrap();
        assert_eq!(ec.logical_qubits, 5);
        assert!(ec.logical_error_rate < 1e-4);
        assert!(ec.logical_error_rate < ec.physical_error_rate / 1000.0);
        assert!(apply_error_correction(9).is_err());
    }

    #[test]
    fn test_logical_error_rate_monotonic() {
        let f = 0.999;
        let d3 = estimate_logical_error_rate(f, 3);
        let d5 = estimate_logical_error_rate(f, 5);
        let d7 = estimate_logical_error_rate(f, 7);
        assert!(d3 > d5 && d5 > d7);

        let noisy = estimate_logical_error_rate(0.995, 5);
        let clean = estimate_logical_error_rate(0.999, 5);
        assert!(noisy > clean);
    }

    #[test]
    fn test_meets_target_boundary() {
        assert!(meets_target(TARGET_FIDELITY));
        assert!(meets_target(0.99999));
        assert!(!meets_target(0.9996));
    }

    #[test]
    fn test_specs() {
        let s = specs();
        assert_eq!(s.qubit_count, 50);
        assert_eq!(s.target_fidelity, 0.9997);
        assert_eq!(s.target_two_qubit_fidelity, 0.9950);
    }
}
