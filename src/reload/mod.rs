//! Hot reload subsystem.
//!
//! # Data Flow
//! ```text
//! startup / ReloadRequest (from config::watcher)
//!     → controller.rs: Idle → Validating
//!         → schema → loops → coverage (warnings only)
//!         → Accepted: build RoutingTable + CertificateStore
//!                     → snapshot.rs: one atomic swap of Arc<ConfigSnapshot>
//!         → Rejected: log, previous snapshot stays current
//!     → Idle
//! ```
//!
//! # Design Decisions
//! - The snapshot cell is the only shared mutable state in the proxy
//! - Readers never see a routing table paired with another version's certificates
//! - Old snapshots are dropped when their last reader lets go

pub mod controller;
pub mod snapshot;

pub use controller::{ReloadController, ReloadOutcome, ReloadState};
pub use snapshot::{ConfigSnapshot, SnapshotHandle};
