// Telemetry service - parses candidate lines and publishes the domain state
use crate::application::alert_log::AlertLog;
use crate::application::telemetry_translator::translate;
use crate::domain::alert::AlertKind;
use crate::domain::telemetry::DomainState;
use crate::infrastructure::frame_parser::{self, ParseOutcome};
use std::sync::Arc;
use tokio::sync::{RwLock, watch};

/// Callback run once per accepted telemetry frame with the new state.
pub type FrameHandler = Arc<dyn Fn(&DomainState) + Send + Sync>;

/// What happened to one candidate line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineDisposition {
    Applied,
    DeviceError,
    Ignored,
    Rejected,
}

/// Owner of the published `DomainState`.
///
/// Only the read loop calls `ingest_line`, so the state has a single writer.
/// Readers go through `subscribe` or `current` and always see a whole state.
pub struct TelemetryService {
    state_tx: watch::Sender<DomainState>,
    alerts: Arc<AlertLog>,
    frame_handler: RwLock<Option<FrameHandler>>,
}

impl TelemetryService {
    pub fn new(alerts: Arc<AlertLog>) -> Self {
        let (state_tx, _) = watch::channel(DomainState::default());
        Self {
            state_tx,
            alerts,
            frame_handler: RwLock::new(None),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<DomainState> {
        self.state_tx.subscribe()
    }

    pub fn current(&self) -> DomainState {
        self.state_tx.borrow().clone()
    }

    /// Replace the frame callback. Takes effect from the next frame.
    pub async fn set_frame_handler(&self, handler: Option<FrameHandler>) {
        *self.frame_handler.write().await = handler;
    }

    pub async fn ingest_line(&self, line: &str) -> LineDisposition {
        match frame_parser::parse(line) {
            ParseOutcome::Ignored => LineDisposition::Ignored,
            ParseOutcome::Invalid(e) => {
                tracing::warn!(error = %e, line = line.trim(), "dropping invalid frame");
                LineDisposition::Rejected
            }
            ParseOutcome::DeviceError(frame) => {
                self.alerts.push(AlertKind::Error, frame.message).await;
                LineDisposition::DeviceError
            }
            ParseOutcome::Telemetry(frame) => {
                let state = translate(&frame);
                self.state_tx.send_replace(state.clone());

                let handler = self.frame_handler.read().await.clone();
                if let Some(handler) = handler {
                    handler(&state);
                }
                LineDisposition::Applied
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::telemetry::TrackingMode;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const FRAME: &str = r#"{"ldr_tl":500,"ldr_tr":500,"ldr_bl":500,"ldr_br":500,"temp":25,"hPos":90,"vPos":45,"manual":false,"active":true}"#;

    fn service() -> (TelemetryService, Arc<AlertLog>) {
        let alerts = Arc::new(AlertLog::new(5));
        (TelemetryService::new(alerts.clone()), alerts)
    }

    #[tokio::test]
    async fn test_accepted_frame_replaces_state() {
        let (service, _) = service();
        let mut rx = service.subscribe();

        assert_eq!(service.ingest_line(FRAME).await, LineDisposition::Applied);
        assert!(rx.has_changed().unwrap());

        let state = rx.borrow_and_update().clone();
        assert_eq!(state.power_metrics.power, 19.6);
        assert_eq!(state.power_metrics.efficiency, 46);
        assert_eq!(state.panel_position.elevation, 45.0);
        assert_eq!(state.system_status.mode, TrackingMode::Automatic);
    }

    #[tokio::test]
    async fn test_garbage_leaves_state_untouched() {
        let (service, alerts) = service();
        service.ingest_line(FRAME).await;
        let before = service.current();

        assert_eq!(service.ingest_line("not json").await, LineDisposition::Ignored);
        assert_eq!(service.ingest_line("{broken").await, LineDisposition::Ignored);
        assert_eq!(service.ingest_line("{broken}").await, LineDisposition::Rejected);
        assert_eq!(service.ingest_line("{\"ldr_tl\":1}").await, LineDisposition::Rejected);

        assert_eq!(service.current(), before);
        assert!(alerts.recent().await.is_empty());
    }

    #[tokio::test]
    async fn test_device_error_raises_alert_without_state_change() {
        let (service, alerts) = service();
        service.ingest_line(FRAME).await;
        let before = service.current();

        let disposition = service.ingest_line(r#"{"error":"overheat"}"#).await;
        assert_eq!(disposition, LineDisposition::DeviceError);
        assert_eq!(service.current(), before);

        let recent = alerts.recent().await;
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].kind, AlertKind::Error);
        assert_eq!(recent[0].message, "overheat");
    }

    #[tokio::test]
    async fn test_frame_handler_called_once_per_frame_and_replaceable() {
        let (service, _) = service();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let counter = first.clone();
        service
            .set_frame_handler(Some(Arc::new(move |_: &DomainState| {
                counter.fetch_add(1, Ordering::SeqCst);
            })))
            .await;
        service.ingest_line(FRAME).await;
        service.ingest_line(r#"{"error":"overheat"}"#).await;
        service.ingest_line(FRAME).await;

        let counter = second.clone();
        service
            .set_frame_handler(Some(Arc::new(move |state: &DomainState| {
                assert!(state.system_status.is_active);
                counter.fetch_add(1, Ordering::SeqCst);
            })))
            .await;
        service.ingest_line(FRAME).await;

        assert_eq!(first.load(Ordering::SeqCst), 2);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }
}
