//! Dashboard export and multipoint propagation.
//!
//! The scheduler serializes an [`ExportPayload`] as JSON and hands it to an
//! [`ExportSink`] once per configured endpoint. Endpoints are delivered to
//! concurrently; each gets `retry_count` attempts bounded by
//! `attempt_timeout`, and a failing endpoint never holds up the others.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use vaultproof_core::FidelityMetrics;
use vaultproof_ledger::SyncStatus;

use crate::events::{Dashboard, ProofSummary};

/// Errors from encoding or delivering an export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("endpoint {endpoint} rejected payload: {reason}")]
    Rejected { endpoint: String, reason: String },

    #[error("endpoint {endpoint} timed out")]
    Timeout { endpoint: String },
}

/// Snapshot of the dashboard sent to every endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportPayload {
    pub timestamp: i64,
    pub metrics: Option<FidelityMetrics>,
    pub proofs: Vec<ProofSummary>,
    pub graph_size: usize,
    pub sync_status: Option<SyncStatus>,
    pub last_update: i64,
}

impl ExportPayload {
    pub fn from_dashboard(dashboard: &Dashboard, timestamp: i64) -> Self {
        Self {
            timestamp,
            metrics: dashboard.metrics,
            proofs: dashboard.proofs.values().cloned().collect(),
            graph_size: dashboard.graph.len(),
            sync_status: dashboard.sync_status.clone(),
            last_update: dashboard.last_update,
        }
    }

    pub fn to_json(&self) -> Result<Bytes, ExportError> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }
}

/// Propagation settings.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub endpoints: Vec<String>,
    /// Attempts per endpoint, at least 1.
    pub retry_count: u32,
    pub attempt_timeout: Duration,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            retry_count: 3,
            attempt_timeout: Duration::from_secs(5),
        }
    }
}

impl ExportConfig {
    /// Load configuration from `VAULTPROOF_EXPORT_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let endpoints = std::env::var("VAULTPROOF_EXPORT_ENDPOINTS")
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let retry_count = std::env::var("VAULTPROOF_EXPORT_RETRY_COUNT")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|n: &u32| *n > 0)
            .unwrap_or(defaults.retry_count);

        let attempt_timeout = std::env::var("VAULTPROOF_EXPORT_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.attempt_timeout);

        Self {
            endpoints,
            retry_count,
            attempt_timeout,
        }
    }
}

/// Destination for exported payloads.
#[async_trait]
pub trait ExportSink: Send + Sync {
    async fn deliver(&self, endpoint: &str, body: Bytes) -> Result<(), ExportError>;
}

/// Delivery result for one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointOutcome {
    pub endpoint: String,
    pub delivered: bool,
    pub attempts: u32,
    pub last_error: Option<String>,
}

/// Delivery results for every endpoint, in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropagationReport {
    pub outcomes: Vec<EndpointOutcome>,
}

impl PropagationReport {
    pub fn delivered(&self) -> usize {
        self.outcomes.iter().filter(|o| o.delivered).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.delivered()
    }
}

async fn deliver_with_retry(
    sink: Arc<dyn ExportSink>,
    endpoint: String,
    body: Bytes,
    retry_count: u32,
    attempt_timeout: Duration,
) -> EndpointOutcome {
    let mut last_error = None;
    let attempts = retry_count.max(1);

    for attempt in 1..=attempts {
        let result = tokio::time::timeout(attempt_timeout, sink.deliver(&endpoint, body.clone()))
            .await
            .unwrap_or_else(|_| {
                Err(ExportError::Timeout {
                    endpoint: endpoint.clone(),
                })
            });

        match result {
            Ok(()) => {
                debug!(%endpoint, attempt, "export delivered");
                return EndpointOutcome {
                    endpoint,
                    delivered: true,
                    attempts: attempt,
                    last_error: None,
                };
            }
            Err(e) => {
                debug!(%endpoint, attempt, error = %e, "export attempt failed");
                last_error = Some(e.to_string());
            }
        }
    }

    warn!(%endpoint, attempts, error = ?last_error, "export propagation failed");
    EndpointOutcome {
        endpoint,
        delivered: false,
        attempts,
        last_error,
    }
}

/// Deliver `payload` to every configured endpoint.
pub async fn propagate(
    sink: Arc<dyn ExportSink>,
    payload: &ExportPayload,
    config: &ExportConfig,
) -> Result<PropagationReport, ExportError> {
    let body = payload.to_json()?;

    let mut tasks = JoinSet::new();
    for (index, endpoint) in config.endpoints.iter().enumerate() {
        let outcome = deliver_with_retry(
            sink.clone(),
            endpoint.clone(),
            body.clone(),
            config.retry_count,
            config.attempt_timeout,
        );
        tasks.spawn(async move { (index, outcome.await) });
    }

    let mut outcomes: Vec<Option<EndpointOutcome>> = vec![None; config.endpoints.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, outcome)) => outcomes[index] = Some(outcome),
            Err(e) => warn!(error = %e, "export task failed"),
        }
    }

    let outcomes = outcomes
        .into_iter()
        .zip(&config.endpoints)
        .map(|(outcome, endpoint)| {
            outcome.unwrap_or_else(|| EndpointOutcome {
                endpoint: endpoint.clone(),
                delivered: false,
                attempts: 0,
                last_error: Some("delivery task aborted".into()),
            })
        })
        .collect();
    Ok(PropagationReport { outcomes })
}

/// In-memory sink that records deliveries.
///
/// Endpoints can be scripted to fail a number of times or to stall, which is
/// how the retry and timeout paths are exercised.
#[derive(Default)]
pub struct MemorySink {
    delivered: Mutex<Vec<(String, Bytes)>>,
    failures: Mutex<HashMap<String, u32>>,
    stalls: Mutex<HashMap<String, Duration>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next `times` deliveries to `endpoint`.
    pub async fn fail_next(&self, endpoint: &str, times: u32) {
        self.failures.lock().await.insert(endpoint.to_string(), times);
    }

    /// Delay every delivery to `endpoint` by `delay`.
    pub async fn stall(&self, endpoint: &str, delay: Duration) {
        self.stalls.lock().await.insert(endpoint.to_string(), delay);
    }

    /// Every accepted delivery, in arrival order.
    pub async fn delivered(&self) -> Vec<(String, Bytes)> {
        self.delivered.lock().await.clone()
    }
}

#[async_trait]
impl ExportSink for MemorySink {
    async fn deliver(&self, endpoint: &str, body: Bytes) -> Result<(), ExportError> {
        let stall = self.stalls.lock().await.get(endpoint).copied();
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }

        {
            let mut failures = self.failures.lock().await;
            if let Some(remaining) = failures.get_mut(endpoint) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(ExportError::Rejected {
                        endpoint: endpoint.to_string(),
                        reason: "scripted failure".into(),
                    });
                }
            }
        }

        self.delivered
            .lock()
            .await
            .push((endpoint.to_string(), body));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(endpoints: &[&str]) -> ExportConfig {
        ExportConfig {
            endpoints: endpoints.iter().map(|e| e.to_string()).collect(),
            ..ExportConfig::default()
        }
    }

    fn payload() -> ExportPayload {
        ExportPayload::from_dashboard(&Dashboard::new(), 42)
    }

    #[tokio::test]
    async fn test_delivers_to_every_endpoint() {
        let sink = Arc::new(MemorySink::new());
        let report = propagate(sink.clone(), &payload(), &config(&["a", "b"]))
            .await
            .unwrap();

        assert_eq!(report.delivered(), 2);
        let delivered = sink.delivered().await;
        assert_eq!(delivered.len(), 2);

        let decoded: ExportPayload = serde_json::from_slice(&delivered[0].1).unwrap();
        assert_eq!(decoded.timestamp, 42);
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let sink = Arc::new(MemorySink::new());
        sink.fail_next("flaky", 2).await;

        let report = propagate(sink.clone(), &payload(), &config(&["flaky"]))
            .await
            .unwrap();
        assert_eq!(report.outcomes[0].attempts, 3);
        assert!(report.outcomes[0].delivered);
    }

    #[tokio::test]
    async fn test_gives_up_after_retry_count() {
        let sink = Arc::new(MemorySink::new());
        sink.fail_next("down", 10).await;

        let report = propagate(sink.clone(), &payload(), &config(&["down", "up"]))
            .await
            .unwrap();
        assert_eq!(report.failed(), 1);
        assert_eq!(report.outcomes[0].endpoint, "down");
        assert_eq!(report.outcomes[0].attempts, 3);
        assert!(report.outcomes[0].last_error.is_some());
        assert!(report.outcomes[1].delivered);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_endpoint_times_out_without_blocking_others() {
        let sink = Arc::new(MemorySink::new());
        sink.stall("slow", Duration::from_secs(30)).await;

        let started = tokio::time::Instant::now();
        let report = propagate(sink.clone(), &payload(), &config(&["slow", "fast"]))
            .await
            .unwrap();

        assert!(!report.outcomes[0].delivered);
        assert!(report.outcomes[0]
            .last_error
            .as_deref()
            .unwrap()
            .contains("timed out"));
        assert!(report.outcomes[1].delivered);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(15) && elapsed < Duration::from_secs(16));
    }

    #[tokio::test]
    async fn test_no_endpoints() {
        let sink = Arc::new(MemorySink::new());
        let report = propagate(sink, &payload(), &ExportConfig::default())
            .await
            .unwrap();
        assert!(report.outcomes.is_empty());
    }
}
