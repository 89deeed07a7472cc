// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod frame_parser;
pub mod line_buffer;
pub mod ndjson_stream;
pub mod serial_transport;
