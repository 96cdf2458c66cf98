//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! hosts file (JSON)
//!     → loader.rs (read, parse, fill in missing default)
//!     → validation.rs (schema, loop detection, coverage warnings)
//!     → ConfigDocument (validated, ordered mappings)
//!     → handed to the reload controller to build a snapshot
//!
//! On file change:
//!     watcher.rs detects change
//!     → ReloadRequest on a channel
//!     → single reload consumer re-runs the pipeline above
//! ```
//!
//! # Design Decisions
//! - The schema is an external document, re-read on every reload
//! - Syntactic checks (JSON Schema) run on the raw value before serde
//! - A rejected candidate never touches published state

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_document, load_schema, ConfigError};
pub use schema::{CertPaths, ConfigDocument};
pub use validation::{validate, validate_candidate, CoverageGap, SchemaViolation, ValidatedConfig};
pub use watcher::{ConfigWatcher, ReloadRequest};
