//! Pulse Core - Admission control for the Pulse event ingestion gateway
//!
//! This crate holds everything the gateway needs to decide whether an event
//! submission is accepted, deduplicated or rejected:
//!
//! # Modules
//!
//! - [`config`] - Strongly-typed configuration with TOML and environment variable support
//! - [`domain`] - Tenants, inbound events and the envelope published to the event log
//! - [`application`] - The admission state machine, its driver and the error taxonomy
//! - [`infrastructure`] - Dragonfly/in-memory admission store, idempotency claims,
//!   fixed-window rate counter, Kafka publisher and the tenant directory
//! - [`logging`] - Structured logging with tracing
//!
//! # Architecture
//!
//! ```text
//! pulse-core/
//! ├── domain/            # Pure data: TenantId, InboundEvent, PublishedEnvelope
//! ├── application/
//! │   ├── errors.rs      # IngestError (client-visible taxonomy)
//! │   └── admission/     # State machine + pipeline driver
//! ├── infrastructure/
//! │   ├── store/         # AdmissionStore trait, Dragonfly + in-memory backends
//! │   ├── idempotency.rs # set-if-absent claims
//! │   ├── rate_limiter/  # fixed-window counter
//! │   ├── publisher/     # EventPublisher trait, Kafka implementation
//! │   └── tenant_directory.rs
//! └── config/            # Configuration management
//! ```
//!
//! # Configuration
//!
//! Environment variables use the `PULSE__` prefix with double underscore separators:
//!
//! ```bash
//! PULSE__SERVER__PORT=8080
//! PULSE__RATE_LIMIT__REQUESTS_PER_WINDOW=300
//! PULSE__EVENT_LOG__BROKERS=kafka-1:9092,kafka-2:9092
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod logging;

pub use config::Config;
pub use logging::init_tracing;
