//! Pulse Gateway - HTTP front end for event admission
//!
//! Exposes `POST /events`, `GET /health` and the OpenAPI document, and maps
//! admission outcomes onto status codes, bodies and rate-limit headers.

pub mod presentation;

pub use presentation::controllers::GatewayState;
pub use presentation::routes::create_router;
