// Application state for HTTP handlers
use crate::application::alert_log::AlertLog;
use crate::application::connection::ConnectionManager;
use crate::application::control_service::ControlService;
use crate::application::telemetry_service::TelemetryService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub connection: Arc<ConnectionManager>,
    pub telemetry: Arc<TelemetryService>,
    pub control: ControlService,
    pub alerts: Arc<AlertLog>,
}
