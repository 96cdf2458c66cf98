//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming hostname (Host header or SNI)
//!     → router.rs (exact lookup, then ordered pattern scan)
//!     → matcher.rs (single-label wildcard patterns)
//!     → Return: Matched(port), Default(port) or NotFound
//!
//! Table Construction (on every accepted reload):
//!     hosts mapping (declaration order) + default policy
//!     → Reject loops back to the listening port
//!     → Compile patterns
//!     → Freeze as immutable RoutingTable
//! ```
//!
//! # Design Decisions
//! - Tables are built per config version, immutable at runtime
//! - Deterministic: same input always resolves to the same port
//! - First declared pattern wins; declaration order survives reloads

pub mod matcher;
pub mod router;

pub use matcher::HostPattern;
pub use router::{DefaultPolicy, LoopDetected, RouteDecision, RouteEntry, RoutingTable};
