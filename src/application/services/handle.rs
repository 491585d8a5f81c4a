use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Owner of a running periodic task.
///
/// Dropping the handle without calling [`LoopHandle::stop`] leaves the task running.
pub struct LoopHandle {
    name: &'static str,
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl LoopHandle {
    /// Ask the task to exit before its next run, then wait for it.
    ///
    /// A run already in progress completes first.
    pub async fn stop(self) {
        // The receiver lives inside the task; a send error means it already exited.
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            tracing::error!(task = self.name, "Periodic task ended abnormally: {e}");
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawn `job` every `period`, first at `start`.
///
/// Runs never overlap and missed periods are not caught up.
pub(crate) fn spawn_periodic<F, Fut>(
    name: &'static str,
    start: Instant,
    period: Duration,
    mut job: F,
) -> LoopHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let (stop_tx, mut stop_rx) = watch::channel(false);
    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(start, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(task = name, period_secs = period.as_secs(), "Periodic task started");

        loop {
            tokio::select! {
                biased;
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    if *stop_rx.borrow() {
                        break;
                    }
                    job().await;
                }
            }
        }
        tracing::info!(task = name, "Periodic task stopped");
    });

    LoopHandle {
        name,
        stop_tx,
        task,
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn runs_on_period_until_stopped() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let handle = spawn_periodic("test", Instant::now(), Duration::from_secs(3), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        // t = 0, 3, 6
        tokio::time::sleep(Duration::from_millis(7_000)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        handle.stop().await;
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_start_skips_immediate_run() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let period = Duration::from_secs(60);
        let handle = spawn_periodic("test", Instant::now() + period, period, move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn slow_run_delays_next_without_overlap() {
        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));
        let runs = Arc::new(AtomicUsize::new(0));
        let (a, m, r) = (Arc::clone(&active), Arc::clone(&max_active), Arc::clone(&runs));
        let handle = spawn_periodic("test", Instant::now(), Duration::from_secs(1), move || {
            let (a, m, r) = (Arc::clone(&a), Arc::clone(&m), Arc::clone(&r));
            async move {
                let now = a.fetch_add(1, Ordering::SeqCst) + 1;
                m.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(5)).await;
                a.fetch_sub(1, Ordering::SeqCst);
                r.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        handle.stop().await;
        assert_eq!(max_active.load(Ordering::SeqCst), 1);
        // Runs start at t = 0, 5, 10; the last finishes during stop.
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }
}
