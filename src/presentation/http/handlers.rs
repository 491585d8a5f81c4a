use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::domain::entities::static_info::StaticInfo;
use crate::domain::entities::subscription::{EmailSubscription, MailRelayConfig};
use crate::domain::entities::threshold::{ThresholdConfig, ThresholdPatch};

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct RelayRequest {
    pub sender: String,
    pub credential: String,
}

#[derive(Debug, Serialize)]
pub struct PatchResponse {
    pub applied: usize,
}

pub async fn get_thresholds(State(state): State<AppState>) -> ApiResult<Json<ThresholdConfig>> {
    state
        .thresholds
        .get()?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("threshold config".into()))
}

/// Lenient merge: unknown branches and non-numeric leaves are ignored.
pub async fn patch_thresholds(
    State(state): State<AppState>,
    Json(changes): Json<Value>,
) -> ApiResult<Json<PatchResponse>> {
    let patch = ThresholdPatch::from_value(&changes);
    let applied = state.thresholds.patch(&patch)?;
    tracing::info!(applied, "Threshold config patched");
    Ok(Json(PatchResponse { applied }))
}

pub async fn add_subscription(
    State(state): State<AppState>,
    Json(request): Json<SubscribeRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let subscription = EmailSubscription::parse(&request.email)?;
    let created = state.subscriptions.add_subscription(&subscription)?;
    let status = if created {
        tracing::info!(email = %subscription.email, "Digest subscription added");
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(json!({ "email": subscription.email }))))
}

pub async fn list_subscriptions(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<EmailSubscription>>> {
    Ok(Json(state.subscriptions.subscriptions()?))
}

pub async fn put_relay(
    State(state): State<AppState>,
    Json(request): Json<RelayRequest>,
) -> ApiResult<StatusCode> {
    let sender = EmailSubscription::parse(&request.sender)?.email;
    state.subscriptions.upsert_relay(&MailRelayConfig {
        sender,
        credential: request.credential,
    })?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn static_info(State(state): State<AppState>) -> Json<StaticInfo> {
    Json(state.static_info.as_ref().clone())
}
