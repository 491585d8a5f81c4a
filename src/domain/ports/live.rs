use crate::domain::entities::metric_tree::Snapshot;

/// Fan-out of each fresh snapshot to connected live consumers.
pub trait LiveSink: Send + Sync {
    /// Push best effort. Returns how many consumers were handed the snapshot.
    fn push(&self, snapshot: &Snapshot) -> usize;
}
