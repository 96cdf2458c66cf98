//! TLS subsystem.
//!
//! # Data Flow
//! ```text
//! Accepted reload
//!     → store.rs (load key/cert/CA per host, fallback certificate)
//!     → CertificateStore inside the new ConfigSnapshot
//!
//! TLS handshake
//!     → resolver.rs (SNI hook, reads the current snapshot)
//!     → exact host certificate, else fallback, else handshake failure
//! ```
//!
//! # Design Decisions
//! - Whether TLS is used is decided once at startup from the initial config
//! - Certificates change with the snapshot, never independently of routes

pub mod resolver;
pub mod store;

pub use resolver::{server_config, SniResolver};
pub use store::{load_certified_key, CertError, CertSpec, CertificateStore};
