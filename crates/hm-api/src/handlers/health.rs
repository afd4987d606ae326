use axum::{Json, extract::State};
use chrono::{SecondsFormat, Utc};
use serde_json::json;
use tokio::time::{Duration, timeout};

use crate::SharedState;
use crate::error::ApiError;

const READINESS_TIMEOUT: Duration = Duration::from_secs(1);

pub async fn banner() -> &'static str {
    "Handyman matching API is running"
}

pub async fn healthz() -> Json<serde_json::Value> {
    Json(json!({
        "ok": true,
        "time": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

pub async fn livez() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Ready when not draining and the candidate source loads within the timeout.
pub async fn readyz(State(state): State<SharedState>) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.readiness.load(std::sync::atomic::Ordering::SeqCst) {
        return Err(ApiError::ServiceUnavailable("shutting_down".into()));
    }

    let source = state.source.clone();
    let candidates = timeout(
        READINESS_TIMEOUT,
        tokio::task::spawn_blocking(move || source.load()),
    )
    .await
    .map_err(|_| ApiError::ServiceUnavailable("source_timeout".into()))?
    .map_err(|err| ApiError::Internal(err.to_string()))?
    .map_err(|err| ApiError::ServiceUnavailable(format!("source check failed: {err}")))?;

    Ok(Json(json!({
        "status": "ok",
        "source": state.source.name(),
        "candidates": candidates.len(),
        "application": env!("CARGO_PKG_NAME"),
    })))
}
