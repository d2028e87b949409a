//! Ledger configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use vaultproof_core::Chain;

/// Deployment endpoint for one chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainEndpoint {
    pub rpc_url: Option<String>,
    pub contract_address: Option<String>,
}

/// Synchronizer configuration.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Per-chain endpoints. Chains without an entry run with no endpoint.
    pub endpoints: BTreeMap<Chain, ChainEndpoint>,
    /// Upper bound for `wait_for_confirmation`.
    pub confirmation_timeout: Duration,
    /// Poll cadence inside `wait_for_confirmation`.
    pub poll_interval: Duration,
    /// Lag normalization window for the sync health score.
    pub aggregation_window: Duration,
    /// Speed-up applied to simulated block production.
    pub time_scale: f64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            endpoints: BTreeMap::new(),
            confirmation_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(1),
            aggregation_window: Duration::from_secs(10),
            time_scale: 1.0,
        }
    }
}

impl LedgerConfig {
    /// Load configuration from `VAULTPROOF_*` environment variables.
    ///
    /// Unset or unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let mut endpoints = BTreeMap::new();
        for chain in Chain::ALL {
            let prefix = format!("VAULTPROOF_{}", chain.as_str().to_uppercase());
            let endpoint = ChainEndpoint {
                rpc_url: std::env::var(format!("{prefix}_RPC_URL")).ok(),
                contract_address: std::env::var(format!("{prefix}_CONTRACT_ADDRESS")).ok(),
            };
            if endpoint != ChainEndpoint::default() {
                endpoints.insert(chain, endpoint);
            }
        }

        let confirmation_timeout = std::env::var("VAULTPROOF_CONFIRMATION_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.confirmation_timeout);

        let poll_interval = std::env::var("VAULTPROOF_POLL_INTERVAL_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|ms: &u64| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(defaults.poll_interval);

        let time_scale = std::env::var("VAULTPROOF_TIME_SCALE")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|scale: &f64| scale.is_finite() && *scale > 0.0)
            .unwrap_or(defaults.time_scale);

        Self {
            endpoints,
            confirmation_timeout,
            poll_interval,
            time_scale,
            ..defaults
        }
    }

    pub fn endpoint(&self, chain: Chain) -> Option<&ChainEndpoint> {
        self.endpoints.get(&chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::default();
        assert_eq!(config.confirmation_timeout, Duration::from_secs(60));
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.aggregation_window, Duration::from_secs(10));
        assert!(config.endpoint(Chain::Ethereum).is_none());
    }
}
