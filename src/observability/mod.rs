//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters for connections, handshakes, routing decisions)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields (connection_id, route, server_id) on every event
//! - Metrics are cheap (atomic increments); recording without an exporter is a no-op

pub mod logging;
pub mod metrics;
