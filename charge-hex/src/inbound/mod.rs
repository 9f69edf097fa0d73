//! HTTP Inbound Adapter
//!
//! Axum-based HTTP server that drives the charge service.

mod handlers;
mod server;

pub use handlers::ApiError;
pub use server::{HttpServer, shutdown_signal};
