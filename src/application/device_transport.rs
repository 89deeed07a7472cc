// Transport trait for reaching the tracker controller
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

pub type DeviceReader = Box<dyn AsyncRead + Send + Unpin>;
pub type DeviceWriter = Box<dyn AsyncWrite + Send + Unpin>;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to open {target}: {source}")]
    Open {
        target: String,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait]
pub trait DeviceTransport: Send + Sync {
    /// Human readable name of the endpoint, used in logs.
    fn describe(&self) -> String;

    /// Open the link and hand back its two halves.
    async fn open(&self) -> Result<(DeviceReader, DeviceWriter), TransportError>;
}
