//! Presentation layer - HTTP controllers, models, and routes

pub mod controllers;
pub mod middleware;
pub mod models;
pub mod routes;

pub use controllers::GatewayState;
pub use middleware::{ingest_error_to_response, logging_middleware};
pub use models::*;
pub use routes::create_router;
