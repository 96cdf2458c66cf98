//! Configuration validation.
//!
//! # Responsibilities
//! - Schema validation of the raw document (black-box `jsonschema` validator)
//! - Loop detection against the listening port
//! - Certificate coverage warnings
//!
//! # Design Decisions
//! - Returns every schema violation, not just the first
//! - Checks run in a fixed order: schema, loops, coverage
//! - Coverage gaps are warnings and never reject a candidate
//! - Pure functions over their inputs; callers decide schema freshness

use jsonschema::Validator;
use serde_json::Value;

use crate::config::loader::ConfigError;
use crate::config::schema::ConfigDocument;
use crate::routing::matcher;
use crate::routing::{DefaultPolicy, LoopDetected};

/// One schema diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// Path from the document root to the offending value.
    pub path: Vec<String>,
    pub message: String,
}

impl std::fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Property at {{root")?;
        for segment in &self.path {
            write!(f, " > {}", segment)?;
        }
        write!(f, "}} {}", self.message)
    }
}

/// A host that no `https` pattern covers while TLS is enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageGap {
    pub host: String,
}

impl std::fmt::Display for CoverageGap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Host {} is not covered by an SSL certificate and does not support HTTPS",
            self.host
        )
    }
}

/// A candidate that passed every rejecting check.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub document: ConfigDocument,
    pub warnings: Vec<CoverageGap>,
}

/// Validate `candidate` against the compiled `schema`.
pub fn validate(candidate: &Value, schema: &Validator) -> Result<(), Vec<SchemaViolation>> {
    let violations: Vec<SchemaViolation> = schema
        .iter_errors(candidate)
        .map(|error| SchemaViolation {
            path: pointer_segments(&error.instance_path.to_string()),
            message: error.to_string(),
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

/// Reject the document if a host or the default bounce targets `listen_port`.
pub fn check_loops(document: &ConfigDocument, listen_port: u16) -> Result<(), LoopDetected> {
    if let Some((host, port)) = document.hosts.iter().find(|(_, port)| **port == listen_port) {
        return Err(LoopDetected::Host {
            host: host.clone(),
            port: *port,
        });
    }
    if let DefaultPolicy::Bounce { port } = document.default {
        if port == listen_port {
            return Err(LoopDetected::DefaultBounce { port });
        }
    }
    Ok(())
}

/// Hosts not matched by any `https` pattern. Empty when TLS is disabled.
pub fn coverage_gaps(document: &ConfigDocument) -> Vec<CoverageGap> {
    let Some(https) = &document.https else {
        return Vec::new();
    };
    document
        .hosts
        .keys()
        .filter(|host| !https.keys().any(|pattern| matcher::matches(pattern, host)))
        .map(|host| CoverageGap { host: host.clone() })
        .collect()
}

/// Run every check on a raw candidate, in order, short-circuiting on the
/// first rejection.
pub fn validate_candidate(
    candidate: &Value,
    schema: &Validator,
    listen_port: u16,
) -> Result<ValidatedConfig, ConfigError> {
    validate(candidate, schema).map_err(ConfigError::SchemaInvalid)?;

    let document: ConfigDocument =
        serde_json::from_value(candidate.clone()).map_err(ConfigError::Shape)?;

    check_loops(&document, listen_port)?;

    let warnings = coverage_gaps(&document);
    Ok(ValidatedConfig { document, warnings })
}

fn pointer_segments(pointer: &str) -> Vec<String> {
    pointer
        .split('/')
        .skip(1)
        .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
        .collect()
}
