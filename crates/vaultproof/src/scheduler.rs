//! Periodic dashboard sync.
//!
//! The [`Scheduler`] owns one consumer task. It folds pipeline events into a
//! [`Dashboard`], and on every tick reads the ledger's aggregated view and
//! propagates an export. Stopping drains queued events, runs one last export
//! and hands back the final dashboard.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use vaultproof_core::{now_millis, EntropySource};
use vaultproof_ledger::LedgerSynchronizer;
use vaultproof_store::ReceiptStore;

use crate::events::{Dashboard, PipelineEvent};
use crate::export::{propagate, ExportConfig, ExportPayload, ExportSink};

/// Scheduler settings.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between dashboard syncs.
    pub tick_interval: Duration,
    /// Width of the aggregated view read on each tick.
    pub view_window: Duration,
    pub export: ExportConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(9),
            view_window: Duration::from_secs(10),
            export: ExportConfig::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        Self {
            export: ExportConfig::from_env(),
            ..Self::default()
        }
    }
}

/// Handle to the running sync task.
pub struct Scheduler {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<Dashboard>,
}

struct Worker<S: ReceiptStore> {
    ledger: Arc<LedgerSynchronizer<S>>,
    sink: Arc<dyn ExportSink>,
    config: SchedulerConfig,
    entropy: EntropySource,
    dashboard: Dashboard,
}

impl<S: ReceiptStore> Worker<S> {
    async fn tick(&mut self) {
        let now = now_millis();
        let window_ms = self.config.view_window.as_millis() as u64;

        match self.ledger.aggregated_view(now, window_ms).await {
            Ok(view) => {
                let metrics = self.entropy.fidelity_metrics();
                self.dashboard
                    .record_sync(view.view_id, view.sync_status, metrics, now);
            }
            Err(e) => warn!(error = %e, "aggregated view failed"),
        }

        let payload = ExportPayload::from_dashboard(&self.dashboard, now);
        match propagate(self.sink.clone(), &payload, &self.config.export).await {
            Ok(report) => debug!(
                delivered = report.delivered(),
                failed = report.failed(),
                "dashboard exported"
            ),
            Err(e) => warn!(error = %e, "dashboard export failed"),
        }
        self.dashboard.last_update = now;
    }
}

impl Scheduler {
    /// Spawn the sync task.
    pub fn start<S>(
        mut events: mpsc::Receiver<PipelineEvent>,
        ledger: Arc<LedgerSynchronizer<S>>,
        sink: Arc<dyn ExportSink>,
        config: SchedulerConfig,
    ) -> Self
    where
        S: ReceiptStore + 'static,
    {
        let (shutdown, mut stop) = watch::channel(false);
        let period = config.tick_interval.max(Duration::from_millis(1));

        let mut worker = Worker {
            ledger,
            sink,
            config,
            entropy: EntropySource::new(),
            dashboard: Dashboard::new(),
        };

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut events_open = true;

            info!(tick_ms = period.as_millis() as u64, "scheduler started");
            loop {
                tokio::select! {
                    biased;
                    _ = stop.changed() => break,
                    event = events.recv(), if events_open => match event {
                        Some(event) => worker.dashboard.apply(&event),
                        None => {
                            debug!("event channel closed");
                            events_open = false;
                        }
                    },
                    _ = ticker.tick() => worker.tick().await,
                }
            }

            while let Ok(event) = events.try_recv() {
                worker.dashboard.apply(&event);
            }
            worker.tick().await;

            info!(
                events = worker.dashboard.events_applied,
                "scheduler stopped"
            );
            worker.dashboard
        });

        Self { shutdown, handle }
    }

    /// Signal shutdown and wait for the final dashboard.
    pub async fn stop(self) -> anyhow::Result<Dashboard> {
        // The task may already have exited; joining reports that.
        let _ = self.shutdown.send(true);
        self.handle.await.context("scheduler task failed")
    }
}
