// Domain layer - Telemetry, command and alert models
pub mod alert;
pub mod command;
pub mod telemetry;
