// Control service - user intents turned into device commands
use crate::application::alert_log::AlertLog;
use crate::application::command_channel::{CommandChannel, CommandError, SendOutcome};
use crate::application::telemetry_service::TelemetryService;
use crate::domain::alert::AlertKind;
use crate::domain::command::Command;
use crate::domain::telemetry::TrackingMode;
use serde::Serialize;
use std::sync::Arc;

pub const EMERGENCY_STOP_MESSAGE: &str = "Software stop command sent to device.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum ControlOutcome {
    Sent { command: String },
    NotConnected,
    /// Angle moves are only honoured while the tracker is in manual mode.
    RejectedNotManual,
}

impl ControlOutcome {
    pub fn from_send(command: Command, outcome: SendOutcome) -> Self {
        match outcome {
            SendOutcome::Sent => ControlOutcome::Sent {
                command: command.to_string(),
            },
            SendOutcome::NotConnected => ControlOutcome::NotConnected,
        }
    }
}

#[derive(Clone)]
pub struct ControlService {
    commands: CommandChannel,
    telemetry: Arc<TelemetryService>,
    alerts: Arc<AlertLog>,
}

impl ControlService {
    pub fn new(
        commands: CommandChannel,
        telemetry: Arc<TelemetryService>,
        alerts: Arc<AlertLog>,
    ) -> Self {
        Self {
            commands,
            telemetry,
            alerts,
        }
    }

    pub async fn set_mode(&self, mode: TrackingMode) -> Result<ControlOutcome, CommandError> {
        let command = match mode {
            TrackingMode::Automatic => Command::Auto,
            TrackingMode::Manual => Command::Manual,
        };
        self.dispatch(command).await
    }

    pub async fn move_azimuth(&self, angle: i32) -> Result<ControlOutcome, CommandError> {
        self.manual_move(Command::Horizontal(angle)).await
    }

    pub async fn move_elevation(&self, angle: i32) -> Result<ControlOutcome, CommandError> {
        self.manual_move(Command::Vertical(angle)).await
    }

    /// Stop an active tracker, start an idle one, as last reported.
    pub async fn toggle_power(&self) -> Result<ControlOutcome, CommandError> {
        let command = if self.telemetry.current().system_status.is_active {
            Command::Stop
        } else {
            Command::Start
        };
        self.dispatch(command).await
    }

    pub async fn calibrate(&self) -> Result<ControlOutcome, CommandError> {
        self.dispatch(Command::Center).await
    }

    pub async fn emergency_stop(&self) -> Result<ControlOutcome, CommandError> {
        let outcome = self.dispatch(Command::Stop).await?;
        if matches!(outcome, ControlOutcome::Sent { .. }) {
            self.alerts.push(AlertKind::Error, EMERGENCY_STOP_MESSAGE).await;
        }
        Ok(outcome)
    }

    async fn manual_move(&self, command: Command) -> Result<ControlOutcome, CommandError> {
        if !self.telemetry.current().is_manual() {
            tracing::debug!(%command, "ignoring move outside manual mode");
            return Ok(ControlOutcome::RejectedNotManual);
        }
        self.dispatch(command).await
    }

    async fn dispatch(&self, command: Command) -> Result<ControlOutcome, CommandError> {
        let outcome = self.commands.send(command).await?;
        Ok(ControlOutcome::from_send(command, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio_util::sync::CancellationToken;

    const MANUAL_ACTIVE: &str = r#"{"ldr_tl":1,"ldr_tr":1,"ldr_bl":1,"ldr_br":1,"temp":20,"hPos":10,"vPos":20,"manual":true,"active":true}"#;

    struct Fixture {
        control: ControlService,
        telemetry: Arc<TelemetryService>,
        alerts: Arc<AlertLog>,
        commands: CommandChannel,
    }

    fn fixture() -> Fixture {
        let alerts = Arc::new(AlertLog::new(5));
        let telemetry = Arc::new(TelemetryService::new(alerts.clone()));
        let commands = CommandChannel::new();
        let control = ControlService::new(commands.clone(), telemetry.clone(), alerts.clone());
        Fixture {
            control,
            telemetry,
            alerts,
            commands,
        }
    }

    async fn written(commands: &CommandChannel, mut device: tokio::io::DuplexStream) -> String {
        commands.detach().await;
        let mut out = String::new();
        device.read_to_string(&mut out).await.unwrap();
        out
    }

    #[tokio::test]
    async fn test_moves_require_manual_mode() {
        let f = fixture();
        let (device, host) = tokio::io::duplex(256);
        f.commands.attach(Box::new(host), CancellationToken::new()).await;

        assert_eq!(
            f.control.move_azimuth(45).await.unwrap(),
            ControlOutcome::RejectedNotManual
        );

        f.telemetry.ingest_line(MANUAL_ACTIVE).await;
        assert_eq!(
            f.control.move_azimuth(45).await.unwrap(),
            ControlOutcome::Sent {
                command: "H45".to_string()
            }
        );
        f.control.move_elevation(60).await.unwrap();

        assert_eq!(written(&f.commands, device).await, "H45\nV60\n");
    }

    #[tokio::test]
    async fn test_power_toggle_follows_reported_state() {
        let f = fixture();
        let (device, host) = tokio::io::duplex(256);
        f.commands.attach(Box::new(host), CancellationToken::new()).await;

        f.control.toggle_power().await.unwrap();
        f.telemetry.ingest_line(MANUAL_ACTIVE).await;
        f.control.toggle_power().await.unwrap();
        f.control.set_mode(TrackingMode::Automatic).await.unwrap();
        f.control.calibrate().await.unwrap();

        assert_eq!(written(&f.commands, device).await, "START\nSTOP\nAUTO\nCENTER\n");
    }

    #[tokio::test]
    async fn test_emergency_stop_alerts_only_when_sent() {
        let f = fixture();
        assert_eq!(f.control.emergency_stop().await.unwrap(), ControlOutcome::NotConnected);
        assert!(f.alerts.recent().await.is_empty());

        let (_device, host) = tokio::io::duplex(256);
        f.commands.attach(Box::new(host), CancellationToken::new()).await;
        f.control.emergency_stop().await.unwrap();

        let recent = f.alerts.recent().await;
        assert_eq!(recent[0].kind, AlertKind::Error);
        assert_eq!(recent[0].message, EMERGENCY_STOP_MESSAGE);
    }
}
