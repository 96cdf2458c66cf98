//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters and gauges via `metrics`)
//!
//! Consumers:
//!     → stdout (human-readable or JSON lines)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Every routing decision and reload attempt is one structured event
//! - Metrics are cheap (atomic increments) and always recorded; exporting
//!   them is opt-in

pub mod logging;
pub mod metrics;
