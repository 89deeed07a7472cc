// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::application::alert_log::AlertLog;
use crate::application::command_channel::CommandChannel;
use crate::application::connection::{ConnectionManager, spawn_link_alerts};
use crate::application::control_service::ControlService;
use crate::application::telemetry_service::TelemetryService;
use crate::domain::telemetry::DomainState;
use crate::infrastructure::config::load_bridge_config;
use crate::infrastructure::serial_transport::SerialTransport;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    calibrate, close_connection, emergency_stop, get_connection, get_state, health_check,
    list_alerts, move_azimuth, move_elevation, open_connection, post_command, set_mode,
    stream_telemetry, toggle_power,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = load_bridge_config()?;

    // Create transport (infrastructure layer)
    let transport = Arc::new(SerialTransport::new(&config.serial));

    // Create services (application layer)
    let alerts = Arc::new(AlertLog::new(config.alerts.capacity));
    let telemetry = Arc::new(TelemetryService::new(alerts.clone()));
    let commands = CommandChannel::new();
    let connection = Arc::new(ConnectionManager::new(
        transport,
        telemetry.clone(),
        commands.clone(),
        config.framing.line_cap(),
    ));
    let control = ControlService::new(commands, telemetry.clone(), alerts.clone());

    connection
        .set_frame_handler(Some(Arc::new(|state: &DomainState| {
            tracing::debug!(
                power = state.power_metrics.power,
                efficiency = state.power_metrics.efficiency,
                azimuth = state.panel_position.azimuth,
                elevation = state.panel_position.elevation,
                "telemetry frame applied"
            );
        })))
        .await;

    // Surface link transitions as alerts
    spawn_link_alerts(connection.subscribe_events(), alerts.clone());

    if config.serial.connect_on_start {
        // A failed open leaves the bridge serving; it can be retried over HTTP.
        if let Err(e) = connection.open().await {
            tracing::warn!(error = %e, "device not connected at startup");
        }
    }

    // Create application state
    let state = Arc::new(AppState {
        connection: connection.clone(),
        telemetry,
        control,
        alerts,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/state", get(get_state))
        .route("/telemetry/stream", get(stream_telemetry))
        .route("/alerts", get(list_alerts))
        .route("/connection", get(get_connection))
        .route("/connection/open", post(open_connection))
        .route("/connection/close", post(close_connection))
        .route("/commands", post(post_command))
        .route("/control/mode/:mode", post(set_mode))
        .route("/control/azimuth/:angle", post(move_azimuth))
        .route("/control/elevation/:angle", post(move_elevation))
        .route("/control/power-toggle", post(toggle_power))
        .route("/control/calibrate", post(calibrate))
        .route("/control/emergency-stop", post(emergency_stop))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.server.bind.parse()?;
    tracing::info!(%addr, "starting solar-tracker-bridge");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    connection.close().await;
    Ok(())
}
