use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use webspecs::domain::entities::metric_tree::Snapshot;
use webspecs::domain::entities::static_info::StaticInfo;
use webspecs::domain::ports::store::{SubscriptionStore, ThresholdStore};
use webspecs::infrastructure::live::broadcast::BroadcastSink;
use webspecs::infrastructure::persistence::sqlite_store::SqliteStore;
use webspecs::infrastructure::persistence::threshold_file::ThresholdFileStore;
use webspecs::presentation::http::{router, AppState};

use crate::ts;

struct Server {
    _dir: TempDir,
    state: AppState,
    store: Arc<SqliteStore>,
}

fn server() -> Server {
    let dir = TempDir::new().expect("tempdir");
    let db = dir.path().join("webspecs.db");
    let file = dir.path().join("notif_config.json");
    let store = Arc::new(SqliteStore::new(db.to_str().expect("utf8")).expect("sqlite"));
    let thresholds =
        Arc::new(ThresholdFileStore::new(file.to_str().expect("utf8"), 80.0).expect("file"));
    let shape = Snapshot::from_json(
        ts(10, 0),
        json!({"cpu": {"percent": {"core_1": 1}}, "memory": {"available_memory": 2}}),
    )
    .expect("tree");
    thresholds.bootstrap_if_absent(&shape).expect("bootstrap");

    let state = AppState {
        thresholds,
        subscriptions: store.clone(),
        live: BroadcastSink::new(4),
        static_info: Arc::new(StaticInfo {
            hostname: Some("box".into()),
            os_name: Some("Linux".into()),
            os_version: None,
            kernel_version: None,
            architecture: "x86_64".into(),
            cpu_brand: None,
            physical_cores: Some(2),
            logical_cores: 4,
            total_memory: 1024,
            total_swap: 0,
            boot_time: None,
            interfaces: Vec::new(),
        }),
    };
    Server {
        _dir: dir,
        state,
        store,
    }
}

async fn call(server: &Server, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            request = request.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = router(server.state.clone())
        .oneshot(request.body(body).expect("request"))
        .await
        .expect("response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes()
        .to_vec();
    (status, bytes)
}

#[tokio::test]
async fn threshold_patch_is_persisted_to_the_file() {
    let server = server();
    let (status, body) = call(
        &server,
        "PATCH",
        "/notifications/thresholds",
        Some(json!({"memory": {"available_memory": 100}, "disk_usage": {"x": 1}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let response: Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(response, json!({"applied": 1}));

    let (status, body) = call(&server, "GET", "/notifications/thresholds", None).await;
    assert_eq!(status, StatusCode::OK);
    let document: Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(
        document,
        json!({"cpu": {"percent": {"core_1": 80.0}}, "memory": {"available_memory": 100.0}})
    );
}

#[tokio::test]
async fn subscriptions_and_relay_land_in_sqlite() {
    let server = server();
    let (status, _) = call(
        &server,
        "POST",
        "/notifications/subscriptions",
        Some(json!({"email": "ops@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = call(
        &server,
        "PUT",
        "/notifications/relay",
        Some(json!({"sender": "monitor@example.com", "credential": "pw"})),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    assert_eq!(server.store.subscriptions().expect("list").len(), 1);
    let relay = server.store.relay().expect("relay").expect("present");
    assert_eq!(relay.sender, "monitor@example.com");
}

#[tokio::test]
async fn static_info_is_served() {
    let server = server();
    let (status, body) = call(&server, "GET", "/system/static-info", None).await;
    assert_eq!(status, StatusCode::OK);
    let info: Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(info["hostname"], "box");
    assert_eq!(info["logical_cores"], 4);
}
