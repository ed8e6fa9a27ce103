//! HTTP surface
//!
//! JSON game API under `/api`, the admin API under `/api/admin`, the leave
//! beacon, health and metrics. No route checks who is calling: any client
//! may act for any session id it presents, and admin routes are open.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, warn};

use crate::game::engine::{Engine, EngineError};
use crate::game::state::{ConfigUpdate, WorldConfig, WorldSnapshot};
use crate::net::protocol::{
    BeaconLeave, DirectionRequest, JoinRequest, SessionRequest, SessionResponse, SuperResponse,
    TickMsRequest, TickResponse,
};
use crate::net::session::SessionId;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub metrics_enabled: bool,
}

/// Failures surfaced to HTTP clients. Details stay in the log.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("Request failed: {}", self);
        (StatusCode::INTERNAL_SERVER_ERROR, "Server Error").into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/api/state", get(get_state))
        .route("/api/session", get(new_session))
        .route("/api/join", post(join))
        .route("/api/leave", post(leave))
        .route("/api/heartbeat", post(heartbeat))
        .route("/api/direction", post(set_direction))
        .route("/api/super", post(use_super))
        .route("/api/tick", post(tick))
        .route("/api/admin/config", get(get_config).post(set_config))
        .route("/api/admin/restart", post(restart))
        .route("/api/admin/wipe", post(wipe))
        .route("/leave", post(beacon_leave))
        .route("/health", get(health));

    if state.metrics_enabled {
        router = router
            .route("/metrics", get(metrics_text))
            .route("/metrics/json", get(metrics_json));
    }

    router.layer(CorsLayer::permissive()).with_state(state)
}

async fn get_state(State(state): State<AppState>) -> ApiResult<Json<WorldSnapshot>> {
    Ok(Json(state.engine.snapshot()?))
}

async fn new_session() -> Json<SessionResponse> {
    Json(SessionResponse {
        session_id: SessionId::generate(),
    })
}

async fn join(
    State(state): State<AppState>,
    Json(req): Json<JoinRequest>,
) -> ApiResult<StatusCode> {
    state
        .engine
        .join(&req.session_id, &req.name, req.color.as_deref())?;
    Ok(StatusCode::NO_CONTENT)
}

async fn leave(
    State(state): State<AppState>,
    Json(req): Json<SessionRequest>,
) -> ApiResult<StatusCode> {
    state.engine.leave(&req.session_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn heartbeat(
    State(state): State<AppState>,
    Json(req): Json<SessionRequest>,
) -> ApiResult<StatusCode> {
    state.engine.heartbeat(&req.session_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_direction(
    State(state): State<AppState>,
    Json(req): Json<DirectionRequest>,
) -> ApiResult<StatusCode> {
    if let Some(dir) = req.direction() {
        state.engine.set_direction(&req.session_id, dir)?;
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn use_super(
    State(state): State<AppState>,
    Json(req): Json<SessionRequest>,
) -> ApiResult<Json<SuperResponse>> {
    let eliminated = state.engine.consume_super_power(&req.session_id)?;
    Ok(Json(SuperResponse { eliminated }))
}

async fn tick(State(state): State<AppState>) -> ApiResult<Json<TickResponse>> {
    let outcome = state.engine.advance()?;
    Ok(Json(TickResponse {
        advanced: outcome.is_advanced(),
    }))
}

async fn get_config(State(state): State<AppState>) -> ApiResult<Json<WorldConfig>> {
    Ok(Json(state.engine.config()?))
}

async fn set_config(
    State(state): State<AppState>,
    Json(update): Json<ConfigUpdate>,
) -> ApiResult<StatusCode> {
    state.engine.admin_set_config(update)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn restart(
    State(state): State<AppState>,
    body: Option<Json<TickMsRequest>>,
) -> ApiResult<StatusCode> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    state.engine.admin_restart(req.tick_ms)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn wipe(
    State(state): State<AppState>,
    body: Option<Json<TickMsRequest>>,
) -> ApiResult<StatusCode> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    state.engine.admin_wipe(req.tick_ms)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Leave notification sent by a closing page. Safe to repeat.
async fn beacon_leave(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().starts_with("application/json"));
    if !is_json {
        return (StatusCode::BAD_REQUEST, "Expected application/json").into_response();
    }

    let session = serde_json::from_slice::<BeaconLeave>(&body)
        .ok()
        .and_then(|b| b.session_id)
        .filter(|s| !s.trim().is_empty());
    let Some(session) = session else {
        return (StatusCode::BAD_REQUEST, "Missing sessionId").into_response();
    };

    match state.engine.leave(&SessionId::new(session)) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            warn!("Beacon leave failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Server Error").into_response()
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn metrics_text(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.engine.metrics().to_prometheus(),
    )
}

async fn metrics_json(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(state.engine.metrics().to_json())
}
