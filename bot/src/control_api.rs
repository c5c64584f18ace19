//! Small HTTP surface for a front end: read status, change settings, pause,
//! resume and stop the run loop.

use std::future::Future;
use std::io;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use cavebot_engine::{RunSignal, StopReason};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::events::{StatusBoard, StatusSnapshot};
use crate::settings::{LocalSettings, SettingsPatch, SharedSettings};

#[derive(Clone)]
pub struct ApiState {
    pub settings: SharedSettings,
    pub status: StatusBoard,
    pub signal: RunSignal,
}

pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/status", get(status))
        .route("/api/settings", get(settings).put(update_settings))
        .route("/api/pause", post(pause))
        .route("/api/stop", post(stop))
        .route("/api/start", post(start))
        .with_state(state)
        .layer(cors)
}

pub fn resolve_api_addr<F>(mut get_env: F) -> SocketAddr
where
    F: FnMut(&str) -> Option<String>,
{
    if let Some(addr) = get_env("CAVEBOT_API_ADDR").and_then(|v| v.parse().ok()) {
        return addr;
    }

    if let Some(port) = get_env("CAVEBOT_API_PORT").and_then(|v| v.parse::<u16>().ok()) {
        return SocketAddr::from(([127, 0, 0, 1], port));
    }

    SocketAddr::from(([127, 0, 0, 1], 4000))
}

pub async fn serve(addr: SocketAddr, state: ApiState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind control api on {addr}"))?;
    info!("control api listening on http://{addr}");
    axum::serve(listener, router(state))
        .await
        .context("control api stopped")
}

/// Requests a stop once `shutdown` resolves. The binary hands it Ctrl-C so
/// an interrupted run still records its session.
pub async fn stop_on<F>(shutdown: F, signal: RunSignal)
where
    F: Future<Output = io::Result<()>>,
{
    match shutdown.await {
        Ok(()) => {
            info!("interrupt received, stopping the run");
            signal.request_stop();
        }
        Err(e) => warn!("cannot listen for interrupts: {e}"),
    }
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    #[serde(flatten)]
    pub status: StatusSnapshot,
    pub requested: Option<StopReason>,
}

async fn status(State(state): State<ApiState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: state.status.snapshot(),
        requested: state.signal.stop_reason(),
    })
}

async fn settings(State(state): State<ApiState>) -> Json<LocalSettings> {
    Json(state.settings.snapshot())
}

async fn update_settings(
    State(state): State<ApiState>,
    Json(patch): Json<SettingsPatch>,
) -> Result<Json<LocalSettings>, (StatusCode, String)> {
    state
        .settings
        .apply(patch)
        .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;
    Ok(Json(state.settings.snapshot()))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlResponse {
    pub ok: bool,
    pub requested: Option<StopReason>,
}

fn control(signal: &RunSignal, ok: bool) -> Json<ControlResponse> {
    Json(ControlResponse {
        ok,
        requested: signal.stop_reason(),
    })
}

async fn pause(State(state): State<ApiState>) -> Json<ControlResponse> {
    info!("pause requested over the api");
    state.signal.request_pause();
    control(&state.signal, true)
}

async fn stop(State(state): State<ApiState>) -> Json<ControlResponse> {
    info!("stop requested over the api");
    state.signal.request_stop();
    control(&state.signal, true)
}

async fn start(
    State(state): State<ApiState>,
) -> Result<Json<ControlResponse>, (StatusCode, String)> {
    if state.signal.resume() {
        info!("start requested over the api");
        Ok(control(&state.signal, true))
    } else {
        Err((
            StatusCode::CONFLICT,
            "a stop is pending; the run cannot be resumed".to_string(),
        ))
    }
}
