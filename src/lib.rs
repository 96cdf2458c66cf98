//! Host-based bouncing reverse proxy.
//!
//! Incoming requests are dispatched to a local backend port chosen by the
//! requested hostname. The routing table and per-host TLS certificates come
//! from a hot-reloaded JSON hosts file and are published together as one
//! immutable snapshot.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod reload;
pub mod routing;
pub mod tls;

pub use config::ConfigDocument;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use reload::{ConfigSnapshot, ReloadController, SnapshotHandle};
pub use routing::{DefaultPolicy, RoutingTable};
