//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! routing + config produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (match/miss/conversion/reload counters)
//!
//! Consumers:
//!     → stdout (plain or JSON)
//!     → whatever metrics recorder the host process installs
//! ```
//!
//! # Design Decisions
//! - Structured fields (route_id, route, method, path) on every event
//! - Metrics are cheap (no-op until a recorder is installed)

pub mod logging;
pub mod metrics;
