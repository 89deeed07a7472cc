// Presentation layer - HTTP surface over the bridge
pub mod app_state;
pub mod handlers;
