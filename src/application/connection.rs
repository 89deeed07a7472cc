// Connection lifecycle - owns the transport session and its read loop
use crate::application::alert_log::AlertLog;
use crate::application::command_channel::{CommandChannel, CommandError, SendOutcome};
use crate::application::device_transport::{DeviceReader, DeviceTransport, TransportError};
use crate::application::telemetry_service::{FrameHandler, LineDisposition, TelemetryService};
use crate::domain::alert::AlertKind;
use crate::domain::command::Command;
use crate::infrastructure::line_buffer::LineBuffer;
use serde::Serialize;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const READ_CHUNK: usize = 256;
const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Completed link transitions. A failed open produces no event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    Connected,
    Disconnected,
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("connection is already {0:?}")]
    AlreadyOpen(ConnectionState),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

struct Session {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Opens and closes the device link.
///
/// At most one session, and so one read loop, exists at a time. The loop owns
/// its `LineBuffer` and is the only caller of `TelemetryService::ingest_line`.
pub struct ConnectionManager {
    transport: Arc<dyn DeviceTransport>,
    telemetry: Arc<TelemetryService>,
    commands: CommandChannel,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    events: broadcast::Sender<LinkEvent>,
    session: Mutex<Option<Session>>,
    max_line_bytes: Option<usize>,
}

impl ConnectionManager {
    pub fn new(
        transport: Arc<dyn DeviceTransport>,
        telemetry: Arc<TelemetryService>,
        commands: CommandChannel,
        max_line_bytes: Option<usize>,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            transport,
            telemetry,
            commands,
            state_tx: Arc::new(state_tx),
            events,
            session: Mutex::new(None),
            max_line_bytes,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<LinkEvent> {
        self.events.subscribe()
    }

    pub async fn open(&self) -> Result<(), ConnectionError> {
        let mut session = self.session.lock().await;

        let current = self.state();
        if current != ConnectionState::Disconnected {
            return Err(ConnectionError::AlreadyOpen(current));
        }
        // The previous loop has already published Disconnected; reap it.
        if let Some(old) = session.take() {
            let _ = old.task.await;
        }

        self.state_tx.send_replace(ConnectionState::Connecting);
        tracing::info!(endpoint = %self.transport.describe(), "opening device link");

        let (reader, writer) = match self.transport.open().await {
            Ok(halves) => halves,
            Err(e) => {
                tracing::error!(error = %e, "failed to open device link");
                self.state_tx.send_replace(ConnectionState::Disconnected);
                return Err(e.into());
            }
        };

        let cancel = CancellationToken::new();
        self.commands.attach(writer, cancel.clone()).await;
        self.state_tx.send_replace(ConnectionState::Connected);
        let _ = self.events.send(LinkEvent::Connected);

        let read_loop = ReadLoop {
            reader,
            buffer: LineBuffer::new(self.max_line_bytes),
            telemetry: self.telemetry.clone(),
            commands: self.commands.clone(),
            state_tx: self.state_tx.clone(),
            events: self.events.clone(),
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(read_loop.run());
        *session = Some(Session { cancel, task });

        tracing::info!(endpoint = %self.transport.describe(), "device link connected");
        Ok(())
    }

    /// Stop the read loop and release the transport. Idempotent.
    ///
    /// Cancelling the session also abandons any command write in progress, so
    /// a device that stopped draining its input cannot hold this up.
    pub async fn close(&self) {
        let mut session = self.session.lock().await;
        let Some(Session { cancel, task }) = session.take() else {
            return;
        };

        cancel.cancel();
        if let Err(e) = task.await {
            tracing::error!(error = %e, "read loop task failed");
            self.state_tx.send_replace(ConnectionState::Disconnected);
            let _ = self.events.send(LinkEvent::Disconnected);
            self.commands.detach().await;
        }
    }

    pub async fn send(&self, command: Command) -> Result<SendOutcome, CommandError> {
        self.commands.send(command).await
    }

    /// Replace the per-frame callback; safe while a read loop is running.
    pub async fn set_frame_handler(&self, handler: Option<FrameHandler>) {
        self.telemetry.set_frame_handler(handler).await;
    }
}

struct ReadLoop {
    reader: DeviceReader,
    buffer: LineBuffer,
    telemetry: Arc<TelemetryService>,
    commands: CommandChannel,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    events: broadcast::Sender<LinkEvent>,
    cancel: CancellationToken,
}

#[derive(Debug, Default)]
struct LoopStats {
    applied: u64,
    device_errors: u64,
    ignored: u64,
    rejected: u64,
}

impl ReadLoop {
    async fn run(mut self) {
        let mut chunk = [0u8; READ_CHUNK];
        let mut stats = LoopStats::default();

        loop {
            let read = tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    tracing::debug!("read loop cancelled");
                    break;
                }
                read = self.reader.read(&mut chunk) => read,
            };

            match read {
                Ok(0) => {
                    tracing::info!("device stream ended");
                    break;
                }
                Ok(n) => {
                    for line in self.buffer.append(&chunk[..n]) {
                        match self.telemetry.ingest_line(&line).await {
                            LineDisposition::Applied => stats.applied += 1,
                            LineDisposition::DeviceError => stats.device_errors += 1,
                            LineDisposition::Ignored => stats.ignored += 1,
                            LineDisposition::Rejected => stats.rejected += 1,
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "error reading from device");
                    break;
                }
            }
        }

        tracing::info!(
            applied = stats.applied,
            device_errors = stats.device_errors,
            ignored = stats.ignored,
            rejected = stats.rejected,
            overflows = self.buffer.overflows(),
            discarded_bytes = self.buffer.pending_len(),
            "read loop finished"
        );

        // Release a sender stuck on a full device buffer before detaching.
        // `open` reaps this task before attaching a new writer.
        self.cancel.cancel();
        self.state_tx.send_replace(ConnectionState::Disconnected);
        let _ = self.events.send(LinkEvent::Disconnected);
        self.commands.detach().await;
    }
}

/// Raise an alert for every completed link transition.
pub fn spawn_link_alerts(
    mut events: broadcast::Receiver<LinkEvent>,
    alerts: Arc<AlertLog>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(LinkEvent::Connected) => alerts.push(AlertKind::Info, "Device connected.").await,
                Ok(LinkEvent::Disconnected) => {
                    alerts.push(AlertKind::Warning, "Device disconnected.").await
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "link events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
