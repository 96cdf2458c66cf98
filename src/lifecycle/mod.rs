//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Initial config load → start watcher + reload loop → bind listener
//!     → plaintext or TLS decided from the initial snapshot
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → server drains, reload loop exits
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - A bad initial config never prevents startup; an empty table is served
//! - Failing to bind the listening port is the only fatal startup error

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{run, Settings, StartupError};
