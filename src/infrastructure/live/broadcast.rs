use std::sync::Arc;

use tokio::sync::broadcast;

use crate::domain::entities::metric_tree::Snapshot;
use crate::domain::ports::live::LiveSink;

/// Default buffer capacity, in snapshots.
const DEFAULT_CAPACITY: usize = 16;

/// Fans each snapshot out to every websocket as pre-serialized JSON.
///
/// When a receiver falls more than `capacity` snapshots behind it observes
/// `RecvError::Lagged` and resumes at the oldest retained one.
#[derive(Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<Arc<str>>,
}

impl BroadcastSink {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<str>> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl LiveSink for BroadcastSink {
    fn push(&self, snapshot: &Snapshot) -> usize {
        let payload = match snapshot.to_live_json() {
            Ok(json) => Arc::<str>::from(json),
            Err(e) => {
                tracing::warn!("Snapshot not serializable for live push: {e}");
                return 0;
            }
        };
        // A send error only means nobody is listening.
        self.sender.send(payload).unwrap_or(0)
    }
}
