use axum::extract::{FromRef, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use hb_capture::Frame;
use hb_domain::constants::BINARY_NAME;
use hb_telemetry::{LedColor, OPENMETRICS_CONTENT_TYPE, StatusHub};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Shared state of the HTTP handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub hub: StatusHub,
    pub node_id: Arc<str>,
    pub capture_id: Arc<str>,
}

impl FromRef<AppState> for StatusHub {
    fn from_ref(state: &AppState) -> Self {
        state.hub.clone()
    }
}

#[derive(Debug, Serialize)]
struct RootResponse {
    message: &'static str,
    node_id: Arc<str>,
    capture_id: Arc<str>,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    led: LedColor,
    frames: u64,
    parse_errors: u64,
    rotations: u64,
    last_timestamp: Option<i64>,
}

pub fn init(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/metrics", get(metrics))
        .route("/frame", get(last_frame))
        .route("/status", get(status))
        .merge(hb_kernel::server::system_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    Json(RootResponse { message: BINARY_NAME, node_id: state.node_id, capture_id: state.capture_id })
}

async fn metrics(State(hub): State<StatusHub>) -> Response {
    match hub.metrics().encode() {
        Ok(body) => ([(header::CONTENT_TYPE, OPENMETRICS_CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        },
    }
}

/// Last frame as JSON, or `404` with `null` before the first one arrives.
async fn last_frame(State(hub): State<StatusHub>) -> (StatusCode, Json<Option<Arc<Frame>>>) {
    let frame = hub.last_frame();
    let code = if frame.is_some() { StatusCode::OK } else { StatusCode::NOT_FOUND };
    (code, Json(frame))
}

async fn status(State(hub): State<StatusHub>) -> Json<StatusResponse> {
    let metrics = hub.metrics();
    Json(StatusResponse {
        led: hub.led_color(),
        frames: metrics.frames(),
        parse_errors: metrics.parse_errors(),
        rotations: metrics.rotations(),
        last_timestamp: hub.last_frame().and_then(|frame| frame.timestamp()),
    })
}
