//! Control-plane HTTP/WebSocket API.
//!
//! Endpoints:
//! - `GET  /api/version`: version string
//! - `GET  /api/system/algorithm`: running algorithm name, 204 when manual
//! - `PUT  /api/system/algorithm?name=<name|"">`: swap or disable
//! - `GET  /api/system/algorithms`: selectable algorithm names
//! - `POST /api/system/algorithm/reset`: reset the engine
//! - `GET  /api/system/network`: current graph nodes
//! - `PUT  /api/system/network`: store operator coordinates
//! - `POST /api/command/{speed,logging,destination-reached,follow,turn}`:
//!   direct pass-through to the sender for manual control
//! - `GET  /api/monitoring`: WebSocket stream of mission log events

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

use crate::algorithm::AlgorithmKind;
use crate::competition::{self, NetworkDocument};
use crate::constants::VERSION;
use crate::engine::Engine;
use crate::mission_log::{LogEntry, MissionLog};
use crate::network::Node;

pub struct AppState {
    pub engine: Arc<Engine>,
    pub log: MissionLog,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/version", get(version))
        .route("/api/system/algorithm", get(get_algorithm).put(set_algorithm))
        .route("/api/system/algorithms", get(list_algorithms))
        .route("/api/system/algorithm/reset", post(reset))
        .route("/api/system/network", get(get_network).put(set_network))
        .route("/api/command/speed", post(command_speed))
        .route("/api/command/logging", post(command_logging))
        .route(
            "/api/command/destination-reached",
            post(command_destination_reached),
        )
        .route("/api/command/follow", post(command_follow))
        .route("/api/command/turn", post(command_turn))
        .route("/api/monitoring", get(monitoring))
        .with_state(state)
}

type ApiError = (StatusCode, String);

fn internal(e: impl std::fmt::Display) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn bad_request(message: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, message.into())
}

// ── System ────────────────────────────────────────────────────────────────────

async fn version() -> &'static str {
    VERSION
}

async fn get_algorithm(State(state): State<Arc<AppState>>) -> Response {
    match state.engine.algorithm_name().await {
        Some(name) => name.into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

#[derive(Deserialize)]
struct AlgorithmQuery {
    name: Option<String>,
}

async fn set_algorithm(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AlgorithmQuery>,
) -> Result<Response, ApiError> {
    let Some(name) = query.name else {
        return Err(bad_request("Algorithm name is required"));
    };
    let kind = if name.is_empty() {
        None
    } else {
        Some(
            AlgorithmKind::from_name(&name)
                .ok_or_else(|| bad_request(format!("Unknown algorithm: {name}")))?,
        )
    };
    state.engine.change_algorithm(kind).await.map_err(internal)?;
    Ok(match state.engine.algorithm_name().await {
        Some(name) => name.into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

async fn list_algorithms() -> Json<Vec<&'static str>> {
    Json(AlgorithmKind::ALL.iter().map(|k| k.name()).collect())
}

async fn reset(State(state): State<Arc<AppState>>) -> Result<&'static str, ApiError> {
    state.engine.reset().await.map_err(internal)?;
    Ok("Engine reset")
}

async fn get_network(State(state): State<Arc<AppState>>) -> Json<Vec<Node>> {
    Json(state.engine.create_network().nodes().to_vec())
}

async fn set_network(
    Json(document): Json<NetworkDocument>,
) -> Result<StatusCode, ApiError> {
    // reject documents the provider would not be able to load
    competition::network_from_document(&document)
        .map_err(|e| bad_request(format!("Invalid network: {e}")))?;
    competition::store_document(&document).map_err(internal)?;
    Ok(StatusCode::OK)
}

// ── Manual commands ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct SpeedBody {
    speed: i16,
}

async fn command_speed(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SpeedBody>,
) -> Result<StatusCode, ApiError> {
    if !(-100..=100).contains(&body.speed) {
        return Err(bad_request("speed must be within -100..=100"));
    }
    state
        .engine
        .sender()
        .set_speed(body.speed as i8)
        .await
        .map_err(internal)?;
    Ok(StatusCode::OK)
}

#[derive(Deserialize)]
struct LoggingBody {
    enabled: bool,
}

async fn command_logging(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoggingBody>,
) -> Result<StatusCode, ApiError> {
    state
        .engine
        .sender()
        .set_debug_logging(body.enabled)
        .await
        .map_err(internal)?;
    Ok(StatusCode::OK)
}

async fn command_destination_reached(
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, ApiError> {
    state
        .engine
        .sender()
        .destination_reached()
        .await
        .map_err(internal)?;
    Ok(StatusCode::OK)
}

async fn command_follow(State(state): State<Arc<AppState>>) -> Result<StatusCode, ApiError> {
    state.engine.sender().follow_line().await.map_err(internal)?;
    Ok(StatusCode::OK)
}

#[derive(Deserialize)]
struct TurnBody {
    angle: i16,
    snap: bool,
}

async fn command_turn(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TurnBody>,
) -> Result<StatusCode, ApiError> {
    if !(-180..=180).contains(&body.angle) {
        return Err(bad_request("angle must be within -180..=180"));
    }
    state
        .engine
        .sender()
        .turn(body.angle, body.snap)
        .await
        .map_err(internal)?;
    Ok(StatusCode::OK)
}

// ── Monitoring ────────────────────────────────────────────────────────────────

async fn monitoring(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_monitoring(socket, state))
}

fn log_frame(entry: &LogEntry) -> String {
    json!({ "type": "log", "data": entry }).to_string()
}

async fn handle_monitoring(mut socket: WebSocket, state: Arc<AppState>) {
    debug!("new monitoring client connected");

    // replay the buffer, then stream live entries
    for entry in state.log.replay() {
        if socket.send(Message::Text(log_frame(&entry))).await.is_err() {
            debug!("client disconnected");
            return;
        }
    }

    let mut stream = state.log.subscribe();
    loop {
        tokio::select! {
            entry = stream.recv() => match entry {
                Ok(entry) => {
                    if socket.send(Message::Text(log_frame(&entry))).await.is_err() {
                        debug!("client disconnected");
                        return;
                    }
                }
                // fell behind the ring buffer, keep going with what's next
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return,
            },
            message = socket.recv() => match message {
                Some(Ok(Message::Text(text))) if text == "close" => {
                    let _ = socket.close().await;
                    return;
                }
                Some(Ok(_)) => {}
                _ => return,
            },
        }
    }
}
