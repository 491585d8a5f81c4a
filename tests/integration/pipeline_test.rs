use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use serde_json::json;
use tempfile::TempDir;

use webspecs::application::services::live_loop::LiveLoop;
use webspecs::domain::entities::threshold::{ThresholdNode, ThresholdPatch};
use webspecs::domain::ports::store::{AlertStore, ThresholdStore};
use webspecs::domain::value_objects::window::AlertWindow;
use webspecs::infrastructure::live::broadcast::BroadcastSink;
use webspecs::infrastructure::persistence::sqlite_store::SqliteStore;
use webspecs::infrastructure::persistence::threshold_file::ThresholdFileStore;

use crate::{ts, QueueSampler};

struct Rig {
    _dir: TempDir,
    store: Arc<SqliteStore>,
    thresholds: Arc<ThresholdFileStore>,
    sink: BroadcastSink,
}

fn rig() -> Rig {
    let dir = TempDir::new().expect("tempdir");
    let db = dir.path().join("webspecs.db");
    let file = dir.path().join("notif_config.json");
    Rig {
        store: Arc::new(SqliteStore::new(db.to_str().expect("utf8")).expect("sqlite")),
        thresholds: Arc::new(
            ThresholdFileStore::new(file.to_str().expect("utf8"), 80.0).expect("file"),
        ),
        sink: BroadcastSink::new(8),
        _dir: dir,
    }
}

fn live_loop(rig: &Rig, sampler: QueueSampler) -> LiveLoop {
    LiveLoop::new(
        Arc::new(sampler),
        rig.store.clone(),
        rig.thresholds.clone(),
        rig.store.clone(),
        Arc::new(rig.sink.clone()),
        Duration::from_secs(3),
    )
}

#[test]
fn first_tick_bootstraps_threshold_file_with_defaults() {
    let rig = rig();
    let live = live_loop(
        &rig,
        QueueSampler::new(vec![(
            ts(10, 0),
            json!({"cpu": {"percent": {"core_1": 10.0}}, "memory": {"available_memory": 500}}),
        )]),
    );

    let outcome = live.run_tick().expect("tick");
    assert_eq!(outcome.alerts, 0);
    assert!(outcome.persisted);

    let raw = std::fs::read_to_string(rig.thresholds.path()).expect("file written");
    let written: serde_json::Value = serde_json::from_str(&raw).expect("json");
    assert_eq!(
        written,
        json!({"cpu": {"percent": {"core_1": 80.0}}, "memory": {"available_memory": ""}})
    );
}

#[test]
fn breaches_are_stored_unsent_and_disabled_leaves_stay_quiet() {
    let rig = rig();
    let live = live_loop(
        &rig,
        QueueSampler::new(vec![
            (
                ts(10, 0),
                json!({"cpu": {"percent": {"core_1": 10.0}}, "memory": {"available_memory": 500}}),
            ),
            (
                ts(10, 1),
                json!({"cpu": {"percent": {"core_1": 95.0}}, "memory": {"available_memory": 5}}),
            ),
        ]),
    );

    live.run_tick().expect("bootstrap tick");
    assert_eq!(live.run_tick().expect("breach tick").alerts, 1);

    let window = AlertWindow::trailing(ts(11, 0), TimeDelta::hours(1));
    let groups = rig.store.grouped_unsent(&window).expect("query");
    assert_eq!(groups.component_count(), 1);
    let entries = groups.get("cpu-percent-core_1").expect("cpu group");
    assert_eq!(entries.len(), 1);
    assert!((entries[0].value - 95.0).abs() < f64::EPSILON);
    assert!((entries[0].threshold - 80.0).abs() < f64::EPSILON);
    assert_eq!(entries[0].timestamp, ts(10, 1));
}

#[test]
fn patched_threshold_applies_on_next_tick() {
    let rig = rig();
    let tree = json!({"cpu": {"percent": {"core_1": 85.0}}});
    let live = live_loop(
        &rig,
        QueueSampler::new(vec![(ts(10, 0), tree.clone()), (ts(10, 1), tree)]),
    );

    assert_eq!(live.run_tick().expect("first").alerts, 1);

    let patch = ThresholdPatch::from_value(&json!({"cpu": {"percent": {"core_1": 90}}}));
    assert_eq!(rig.thresholds.patch(&patch).expect("patch"), 1);
    assert_eq!(
        rig.thresholds
            .get()
            .expect("get")
            .expect("present")
            .get(&["cpu", "percent", "core_1"]),
        Some(&ThresholdNode::Limit(90.0))
    );

    assert_eq!(live.run_tick().expect("second").alerts, 0);
}

#[tokio::test]
async fn live_consumers_receive_the_bare_tree() {
    let rig = rig();
    let mut rx = rig.sink.subscribe();
    let live = live_loop(
        &rig,
        QueueSampler::new(vec![(ts(10, 0), json!({"swap_memory": {"swap_percent_usage": 3}}))]),
    );

    assert_eq!(live.run_tick().expect("tick").pushed, 1);
    let payload = rx.recv().await.expect("payload");
    let value: serde_json::Value = serde_json::from_str(&payload).expect("json");
    assert_eq!(value, json!({"swap_memory": {"swap_percent_usage": 3.0}}));
}
