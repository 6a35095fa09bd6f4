//! Pulse Ingest - Main application library
//!
//! This is the binary crate that wires the admission core to the HTTP gateway

mod app;

pub use app::{AppHandle, bind_listener, build_app, create_app};
pub use pulse_core::{Config, init_tracing};

// Re-export for convenience
pub use pulse_core;
pub use pulse_gateway;
