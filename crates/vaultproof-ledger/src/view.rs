//! Cross-chain ledger views.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vaultproof_core::{Chain, ChainRecord, Digest, ValidationError};

/// Pending transactions at which the pending score reaches zero.
const PENDING_SATURATION: f64 = 10_000.0;

/// Health above which a synchronized ledger is considered healthy.
const HEALTHY_SCORE: f64 = 0.8;

/// One anchored root and every chain record carrying it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub entry_id: Digest,
    /// The anchored root.
    pub data_hash: Digest,
    /// Root over the entry's chain-record leaves.
    pub merkle_root: Digest,
    /// Earliest submission time across chains (Unix ms).
    pub timestamp: i64,
    pub chains: Vec<ChainRecord>,
    pub aggregation_time: Duration,
}

/// Point-in-time state of one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainState {
    pub chain: Chain,
    pub latest_block: u64,
    pub latest_block_hash: Digest,
    /// Root over every record the chain has anchored.
    pub state_root: Digest,
    pub pending_transactions: u64,
    /// When this state was read (Unix ms).
    pub synced_at: i64,
}

/// Health summary across chain states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub synchronized: bool,
    /// Milliseconds since the stalest chain was read.
    pub lag_ms: u64,
    /// In `[0, 1]`.
    pub health_score: f64,
    pub last_sync: i64,
}

impl SyncStatus {
    /// Summarize `states` as seen at `now`, normalizing lag by `window`.
    pub fn from_states<'a>(
        states: impl IntoIterator<Item = &'a ChainState>,
        now: i64,
        window: Duration,
    ) -> Self {
        let states: Vec<&ChainState> = states.into_iter().collect();
        if states.is_empty() {
            return Self {
                synchronized: false,
                lag_ms: 0,
                health_score: 0.0,
                last_sync: 0,
            };
        }

        let lag_ms = states
            .iter()
            .map(|s| now.saturating_sub(s.synced_at).max(0) as u64)
            .max()
            .unwrap_or(0);
        let last_sync = states.iter().map(|s| s.synced_at).max().unwrap_or(0);

        let avg_pending = states
            .iter()
            .map(|s| s.pending_transactions as f64)
            .sum::<f64>()
            / states.len() as f64;
        let window_ms = window.as_millis().max(1) as f64;

        let pending_score = (1.0 - avg_pending / PENDING_SATURATION).max(0.0);
        let lag_score = (1.0 - lag_ms as f64 / window_ms).max(0.0);
        let health_score = ((pending_score + lag_score) / 2.0).clamp(0.0, 1.0);

        Self {
            synchronized: (lag_ms as f64) < window_ms && health_score > HEALTHY_SCORE,
            lag_ms,
            health_score,
            last_sync,
        }
    }
}

/// Entries anchored within a time window, with the state of every chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedView {
    pub view_id: Digest,
    pub timestamp: i64,
    pub window_start: i64,
    pub window_end: i64,
    pub entries: Vec<LedgerEntry>,
    pub merkle_root: Digest,
    pub chain_states: BTreeMap<Chain, ChainState>,
    pub sync_status: SyncStatus,
}

/// Window bounds centred on `timestamp`: `end - start == window_ms` exactly.
pub fn window_bounds(timestamp: i64, window_ms: u64) -> Result<(i64, i64), ValidationError> {
    let out_of_range = || ValidationError::WindowOutOfRange {
        timestamp,
        window_ms,
    };
    let width = i64::try_from(window_ms).map_err(|_| out_of_range())?;
    let start = timestamp.checked_sub(width / 2).ok_or_else(out_of_range)?;
    let end = start.checked_add(width).ok_or_else(out_of_range)?;
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn state(chain: Chain, pending: u64, synced_at: i64) -> ChainState {
        ChainState {
            chain,
            latest_block: 10,
            latest_block_hash: Digest::hash(b"block"),
            state_root: Digest::hash(b"state"),
            pending_transactions: pending,
            synced_at,
        }
    }

    #[test]
    fn test_fresh_states_are_synchronized() {
        let states = [
            state(Chain::Ethereum, 0, 1_000),
            state(Chain::Polygon, 2, 1_000),
            state(Chain::Solana, 1, 1_000),
        ];
        let status = SyncStatus::from_states(&states, 1_000, Duration::from_secs(10));
        assert!(status.synchronized);
        assert_eq!(status.lag_ms, 0);
        assert!(status.health_score > 0.99);
        assert_eq!(status.last_sync, 1_000);
    }

    #[test]
    fn test_stale_state_is_unhealthy() {
        let states = [state(Chain::Ethereum, 0, 0), state(Chain::Solana, 0, 20_000)];
        let status = SyncStatus::from_states(&states, 20_000, Duration::from_secs(10));
        assert_eq!(status.lag_ms, 20_000);
        assert!(!status.synchronized);
        assert!((status.health_score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_no_states() {
        let status = SyncStatus::from_states(&[], 5, Duration::from_secs(10));
        assert!(!status.synchronized);
        assert_eq!(status.health_score, 0.0);
    }

    #[test]
    fn test_window_bounds_odd_width() {
        assert_eq!(window_bounds(1_000, 11).unwrap(), (995, 1_006));
        assert!(window_bounds(i64::MIN, 10).is_err());
        assert!(window_bounds(0, u64::MAX).is_err());
    }

    proptest! {
        #[test]
        fn prop_window_width_is_exact(
            timestamp in -1_000_000_000_000i64..1_000_000_000_000_000,
            window_ms in 0u64..=(1u64 << 40),
        ) {
            let (start, end) = window_bounds(timestamp, window_ms).unwrap();
            prop_assert_eq!((end - start) as u64, window_ms);
            prop_assert!(start <= timestamp && timestamp <= end);
        }

        #[test]
        fn prop_health_in_unit_range(
            pending in proptest::collection::vec(0u64..50_000, 1..4),
            lag in 0i64..100_000,
        ) {
            let states: Vec<_> = pending
                .iter()
                .map(|p| state(Chain::Polygon, *p, 0))
                .collect();
            let status = SyncStatus::from_states(&states, lag, Duration::from_secs(10));
            prop_assert!((0.0..=1.0).contains(&status.health_score));
        }
    }
}
