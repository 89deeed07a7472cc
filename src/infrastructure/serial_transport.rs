// Serial port implementation of the device transport
use crate::application::device_transport::{
    DeviceReader, DeviceTransport, DeviceWriter, TransportError,
};
use crate::infrastructure::config::SerialSettings;
use async_trait::async_trait;
use tokio_serial::SerialPortBuilderExt;

#[derive(Debug, Clone)]
pub struct SerialTransport {
    port: String,
    baud_rate: u32,
}

impl SerialTransport {
    pub fn new(settings: &SerialSettings) -> Self {
        Self {
            port: settings.port.clone(),
            baud_rate: settings.baud_rate,
        }
    }
}

#[async_trait]
impl DeviceTransport for SerialTransport {
    fn describe(&self) -> String {
        format!("{} @ {} baud", self.port, self.baud_rate)
    }

    async fn open(&self) -> Result<(DeviceReader, DeviceWriter), TransportError> {
        let stream = tokio_serial::new(&self.port, self.baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| TransportError::Open {
                target: self.describe(),
                source: e.into(),
            })?;

        tracing::debug!(port = %self.port, baud = self.baud_rate, "serial port opened");

        let (reader, writer) = tokio::io::split(stream);
        Ok((Box::new(reader), Box::new(writer)))
    }
}
