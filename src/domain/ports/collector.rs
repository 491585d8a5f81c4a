use thiserror::Error;

use crate::domain::entities::metric_tree::Snapshot;
use crate::domain::entities::static_info::StaticInfo;

#[derive(Error, Debug)]
pub enum CollectionError {
    #[error("failed to collect system metrics: {0}")]
    MetricsUnavailable(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
}

pub trait MetricsSampler: Send + Sync {
    /// Read the host counters into one snapshot.
    ///
    /// A counter family that cannot be read is left out of the snapshot
    /// rather than failing the call.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError` only when the sampler itself is unusable.
    fn sample(&self) -> Result<Snapshot, CollectionError>;
}

pub trait StaticInfoProvider: Send + Sync {
    /// Describe the host once (name, OS, hardware, interfaces).
    fn static_info(&self) -> StaticInfo;
}
