//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection (SNI already resolved by the TLS layer)
//!     → server.rs (Axum setup, tracing)
//!     → dispatch.rs (hostname → current snapshot → decision)
//!     → bounce.rs (forward to the decided port) or 404
//!     → Send to client
//! ```

pub mod bounce;
pub mod dispatch;
pub mod server;

pub use bounce::{BounceError, Bouncer, HttpBouncer};
pub use dispatch::{request_host, Dispatcher};
pub use server::HttpServer;
