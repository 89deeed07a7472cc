// Application layer - Framing pipeline, lifecycle and control use cases
pub mod alert_log;
pub mod command_channel;
pub mod connection;
pub mod control_service;
pub mod device_transport;
pub mod telemetry_service;
pub mod telemetry_translator;
