// HTTP request handlers
use crate::application::command_channel::CommandError;
use crate::application::connection::{ConnectionError, ConnectionState};
use crate::application::control_service::ControlOutcome;
use crate::domain::alert::Alert;
use crate::domain::command::{Command, UnknownCommand};
use crate::domain::telemetry::{DomainState, TrackingMode};
use crate::infrastructure::ndjson_stream::stream_from_watch;
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
pub struct CommandRequest {
    pub command: String,
}

#[derive(Debug, Serialize)]
pub struct ConnectionView {
    pub state: ConnectionState,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    BadCommand(#[from] UnknownCommand),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Command(#[from] CommandError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadCommand(_) => StatusCode::BAD_REQUEST,
            ApiError::Connection(ConnectionError::AlreadyOpen(_)) => StatusCode::CONFLICT,
            ApiError::Connection(ConnectionError::Transport(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Command(_) => StatusCode::BAD_GATEWAY,
        };
        tracing::warn!(status = status.as_u16(), error = %self, "request failed");
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Latest domain state
pub async fn get_state(State(state): State<Arc<AppState>>) -> Json<DomainState> {
    Json(state.telemetry.current())
}

/// Live telemetry as newline-delimited JSON
pub async fn stream_telemetry(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    stream_from_watch(state.telemetry.subscribe())
}

pub async fn list_alerts(State(state): State<Arc<AppState>>) -> Json<Vec<Alert>> {
    Json(state.alerts.recent().await)
}

pub async fn get_connection(State(state): State<Arc<AppState>>) -> Json<ConnectionView> {
    Json(ConnectionView {
        state: state.connection.state(),
    })
}

pub async fn open_connection(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ConnectionView>, ApiError> {
    state.connection.open().await?;
    Ok(Json(ConnectionView {
        state: state.connection.state(),
    }))
}

pub async fn close_connection(State(state): State<Arc<AppState>>) -> Json<ConnectionView> {
    state.connection.close().await;
    Json(ConnectionView {
        state: state.connection.state(),
    })
}

/// Send a raw command token such as `H90` or `STOP`
pub async fn post_command(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CommandRequest>,
) -> Result<Response, ApiError> {
    let command: Command = request.command.parse()?;
    let outcome = state.connection.send(command).await?;
    Ok(outcome_response(ControlOutcome::from_send(command, outcome)))
}

pub async fn set_mode(
    Path(mode): Path<TrackingMode>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    Ok(outcome_response(state.control.set_mode(mode).await?))
}

pub async fn move_azimuth(
    Path(angle): Path<i32>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    Ok(outcome_response(state.control.move_azimuth(angle).await?))
}

pub async fn move_elevation(
    Path(angle): Path<i32>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    Ok(outcome_response(state.control.move_elevation(angle).await?))
}

pub async fn toggle_power(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    Ok(outcome_response(state.control.toggle_power().await?))
}

pub async fn calibrate(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    Ok(outcome_response(state.control.calibrate().await?))
}

pub async fn emergency_stop(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    Ok(outcome_response(state.control.emergency_stop().await?))
}

fn outcome_response(outcome: ControlOutcome) -> Response {
    let status = match outcome {
        ControlOutcome::Sent { .. } => StatusCode::OK,
        ControlOutcome::NotConnected | ControlOutcome::RejectedNotManual => StatusCode::CONFLICT,
    };
    (status, Json(outcome)).into_response()
}
