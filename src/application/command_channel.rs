// Outbound command channel - one writer, one whole line at a time
use crate::application::device_transport::DeviceWriter;
use crate::domain::command::Command;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SendOutcome {
    Sent,
    NotConnected,
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("failed to write {command}: {source}")]
    Write {
        command: Command,
        #[source]
        source: std::io::Error,
    },

    #[error("link closed while writing {command}")]
    Interrupted { command: Command },
}

struct AttachedWriter {
    writer: DeviceWriter,
    cancel: CancellationToken,
}

/// Shared handle to the device writer.
///
/// The writer sits behind an async mutex held for the full write and flush,
/// so lines from concurrent senders never interleave. A write in progress is
/// abandoned as soon as the session's token is cancelled.
#[derive(Clone, Default)]
pub struct CommandChannel {
    writer: Arc<Mutex<Option<AttachedWriter>>>,
}

impl CommandChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn attach(&self, writer: DeviceWriter, cancel: CancellationToken) {
        *self.writer.lock().await = Some(AttachedWriter { writer, cancel });
    }

    /// Drop the writer, shutting it down first. Returns false if none was attached.
    pub async fn detach(&self) -> bool {
        let Some(mut attached) = self.writer.lock().await.take() else {
            return false;
        };
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, attached.writer.shutdown()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!(error = %e, "writer shutdown failed"),
            Err(_) => tracing::warn!("writer shutdown timed out"),
        }
        true
    }

    pub async fn send(&self, command: Command) -> Result<SendOutcome, CommandError> {
        let mut guard = self.writer.lock().await;
        let Some(AttachedWriter { writer, cancel }) = guard.as_mut() else {
            tracing::warn!(%command, "device not connected, command not sent");
            return Ok(SendOutcome::NotConnected);
        };
        if cancel.is_cancelled() {
            tracing::warn!(%command, "device link closing, command not sent");
            return Ok(SendOutcome::NotConnected);
        }

        let line = command.to_line();
        let write = async {
            writer.write_all(line.as_bytes()).await?;
            writer.flush().await
        };
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                tracing::warn!(%command, "command write interrupted by link shutdown");
                return Err(CommandError::Interrupted { command });
            }
            written = write => {
                written.map_err(|source| CommandError::Write { command, source })?;
            }
        }

        tracing::debug!(%command, "command sent");
        Ok(SendOutcome::Sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, BufReader};

    #[tokio::test]
    async fn test_send_without_writer_is_benign() {
        let channel = CommandChannel::new();
        let outcome = channel.send(Command::Start).await.unwrap();
        assert_eq!(outcome, SendOutcome::NotConnected);
        assert!(!channel.detach().await);
    }

    #[tokio::test]
    async fn test_send_writes_terminated_token() {
        let (device, host) = tokio::io::duplex(64);
        let channel = CommandChannel::new();
        channel.attach(Box::new(host), CancellationToken::new()).await;

        assert_eq!(channel.send(Command::Horizontal(120)).await.unwrap(), SendOutcome::Sent);
        assert!(channel.detach().await);

        let mut lines = BufReader::new(device).lines();
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("H120"));
        assert_eq!(lines.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_stalled_write() {
        // The device never drains its end, so a 7 byte line cannot fit.
        let (_device, host) = tokio::io::duplex(4);
        let channel = CommandChannel::new();
        let cancel = CancellationToken::new();
        channel.attach(Box::new(host), cancel.clone()).await;

        let sender = channel.clone();
        let pending = tokio::spawn(async move { sender.send(Command::Horizontal(12345)).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!pending.is_finished());

        cancel.cancel();
        let result = tokio::time::timeout(Duration::from_secs(1), pending)
            .await
            .expect("send stayed blocked after cancel")
            .unwrap();
        assert!(matches!(
            result,
            Err(CommandError::Interrupted {
                command: Command::Horizontal(12345)
            })
        ));

        assert_eq!(channel.send(Command::Stop).await.unwrap(), SendOutcome::NotConnected);
        assert!(channel.detach().await);
    }

    #[tokio::test]
    async fn test_concurrent_sends_never_interleave() {
        // A tiny duplex buffer forces every write to be split across many polls.
        let (device, host) = tokio::io::duplex(3);
        let channel = CommandChannel::new();
        channel.attach(Box::new(host), CancellationToken::new()).await;

        let reader = tokio::spawn(async move {
            let mut lines = BufReader::new(device).lines();
            let mut seen = Vec::new();
            while let Some(line) = lines.next_line().await.unwrap() {
                seen.push(line);
            }
            seen
        });

        let mut sends = Vec::new();
        for i in 0..50 {
            let channel = channel.clone();
            sends.push(tokio::spawn(async move {
                let command = if i % 2 == 0 {
                    Command::Horizontal(1000 + i)
                } else {
                    Command::Center
                };
                channel.send(command).await.unwrap()
            }));
        }
        for send in sends {
            assert_eq!(send.await.unwrap(), SendOutcome::Sent);
        }
        channel.detach().await;

        let seen = reader.await.unwrap();
        assert_eq!(seen.len(), 50);
        for line in seen {
            let ok = line == "CENTER" || line.parse::<Command>().is_ok_and(|c| matches!(c, Command::Horizontal(_)));
            assert!(ok, "garbled line: {:?}", line);
        }
    }
}
