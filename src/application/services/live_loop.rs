use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use super::handle::{spawn_periodic, LoopHandle};
use crate::domain::entities::metric_tree::Snapshot;
use crate::domain::evaluator::evaluate;
use crate::domain::ports::collector::{CollectionError, MetricsSampler};
use crate::domain::ports::live::LiveSink;
use crate::domain::ports::store::{AlertStore, MetricsStore, StoreError, ThresholdStore};

/// Result of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    /// Alerts recorded in the alert store this tick.
    pub alerts: usize,
    /// Whether every persistence step succeeded.
    pub persisted: bool,
    /// Live consumers handed the snapshot.
    pub pushed: usize,
}

/// Orchestrates a tick: sample → persist → bootstrap → evaluate → record → push.
pub struct LiveLoop {
    sampler: Arc<dyn MetricsSampler>,
    metrics: Arc<dyn MetricsStore>,
    thresholds: Arc<dyn ThresholdStore>,
    alerts: Arc<dyn AlertStore>,
    sink: Arc<dyn LiveSink>,
    period: Duration,
}

impl LiveLoop {
    #[must_use]
    pub fn new(
        sampler: Arc<dyn MetricsSampler>,
        metrics: Arc<dyn MetricsStore>,
        thresholds: Arc<dyn ThresholdStore>,
        alerts: Arc<dyn AlertStore>,
        sink: Arc<dyn LiveSink>,
        period: Duration,
    ) -> Self {
        Self {
            sampler,
            metrics,
            thresholds,
            alerts,
            sink,
            period,
        }
    }

    /// Run one tick of the pipeline.
    ///
    /// Store failures are logged and skip the rest of persistence and
    /// evaluation; the snapshot is still pushed to live consumers.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError` if the sampler fails, in which case nothing
    /// else runs this tick.
    pub fn run_tick(&self) -> Result<TickOutcome, CollectionError> {
        let snapshot = self.sampler.sample()?;

        let (alerts, persisted) = match self.record(&snapshot) {
            Ok(count) => (count, true),
            Err(e) => {
                tracing::warn!("Tick persistence abandoned: {e}");
                (0, false)
            }
        };

        let pushed = self.sink.push(&snapshot);
        Ok(TickOutcome {
            alerts,
            persisted,
            pushed,
        })
    }

    fn record(&self, snapshot: &Snapshot) -> Result<usize, StoreError> {
        self.metrics.append(snapshot)?;

        if self.thresholds.bootstrap_if_absent(snapshot)? {
            tracing::info!("Threshold config bootstrapped from first snapshot");
        }
        let Some(config) = self.thresholds.get()? else {
            tracing::debug!("No threshold config yet, evaluation skipped");
            return Ok(0);
        };

        let events = evaluate(snapshot, &config, snapshot.timestamp);
        if events.is_empty() {
            tracing::debug!("No thresholds breached");
            return Ok(0);
        }
        self.alerts.append(&events)?;
        tracing::warn!(count = events.len(), "Threshold breach(es) recorded");
        Ok(events.len())
    }

    /// Start ticking immediately, then once per period.
    #[must_use]
    pub fn start(self: Arc<Self>) -> LoopHandle {
        let period = self.period;
        spawn_periodic("live-loop", Instant::now(), period, move || {
            let live = Arc::clone(&self);
            async move {
                match live.run_tick() {
                    Ok(outcome) => tracing::debug!(
                        alerts = outcome.alerts,
                        persisted = outcome.persisted,
                        pushed = outcome.pushed,
                        "Tick complete"
                    ),
                    Err(e) => tracing::warn!("Tick abandoned: {e}"),
                }
            }
        })
    }
}
