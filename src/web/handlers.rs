use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::{app_state::AppState, core::errors::AppError, core::state::RelayStatus};

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    timestamp: String,
    service: &'static str,
    version: &'static str,
    uptime_seconds: u64,
}

#[derive(Serialize)]
pub struct TimeResponse {
    timestamp: String,
    unix: i64,
    message: &'static str,
}

pub async fn index(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "message": format!("{} API", state.config.app_name),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "GET /api/health",
            "time": "GET /api/time",
            "videoProxy": "GET /api/video-proxy (multipart/x-mixed-replace, one viewer at a time)",
            "videoProxyStatus": "GET /api/video-proxy/status",
        },
    }))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339(),
        service: "GrowHub Video Relay",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_seconds(),
    })
}

pub async fn time() -> Json<TimeResponse> {
    let now = Utc::now();
    Json(TimeResponse {
        timestamp: now.to_rfc3339(),
        unix: now.timestamp_millis(),
        message: "Current server time",
    })
}

/// Query strings (cache busters from the dashboard) are deliberately not
/// extracted.
pub async fn video_proxy(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let relay = state.relay.open().await?;
    debug!(session = relay.session, "relay response headers sent");

    let mut response = Body::from_stream(ReceiverStream::new(relay.body)).into_response();
    *response.headers_mut() = relay.headers;
    Ok(response)
}

pub async fn video_proxy_status(State(state): State<Arc<AppState>>) -> Json<RelayStatus> {
    Json(state.relay.status())
}
