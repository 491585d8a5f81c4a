#![allow(clippy::expect_used)]

mod digest_test;
mod http_test;
mod pipeline_test;

use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};
use webspecs::domain::entities::metric_tree::Snapshot;
use webspecs::domain::ports::clock::Clock;
use webspecs::domain::ports::collector::{CollectionError, MetricsSampler};

pub fn ts(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, hour, minute, 0)
        .single()
        .expect("valid time")
}

/// Hands out queued snapshots in order, then fails.
pub struct QueueSampler {
    queue: Mutex<Vec<Snapshot>>,
}

impl QueueSampler {
    pub fn new(trees: Vec<(DateTime<Utc>, serde_json::Value)>) -> Self {
        let mut queue: Vec<Snapshot> = trees
            .into_iter()
            .map(|(at, tree)| Snapshot::from_json(at, tree).expect("valid tree"))
            .collect();
        queue.reverse();
        Self {
            queue: Mutex::new(queue),
        }
    }
}

impl MetricsSampler for QueueSampler {
    fn sample(&self) -> Result<Snapshot, CollectionError> {
        self.queue
            .lock()
            .expect("lock")
            .pop()
            .ok_or_else(|| CollectionError::MetricsUnavailable("queue drained".into()))
    }
}

pub struct FixedClock(pub Mutex<DateTime<Utc>>);

impl FixedClock {
    pub fn at(hour: u32, minute: u32) -> Self {
        Self(Mutex::new(ts(hour, minute)))
    }

    pub fn set(&self, hour: u32, minute: u32) {
        *self.0.lock().expect("lock") = ts(hour, minute);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().expect("lock")
    }
}
