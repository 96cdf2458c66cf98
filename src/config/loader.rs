//! Configuration loading from disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use jsonschema::Validator;
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::validation::SchemaViolation;
use crate::routing::LoopDetected;

/// Reasons a candidate hosts file is not accepted.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot find hosts file {path:?}")]
    Missing { path: PathBuf },

    #[error("failed to read {path:?}: {source}")]
    Unreadable { path: PathBuf, source: io::Error },

    #[error("failed to parse hosts file: {0}")]
    Malformed(serde_json::Error),

    #[error("schema {path:?} is unusable: {reason}")]
    SchemaUnusable { path: PathBuf, reason: String },

    #[error("hosts file is invalid ({} violation(s))", .0.len())]
    SchemaInvalid(Vec<SchemaViolation>),

    #[error(transparent)]
    LoopDetected(#[from] LoopDetected),

    #[error("hosts file does not describe a routing table: {0}")]
    Shape(serde_json::Error),
}

/// Read and parse the hosts file, filling in a missing `default`.
pub fn load_document(path: &Path) -> Result<Value, ConfigError> {
    let content = read(path)?;
    let mut document: Value = serde_json::from_str(&content).map_err(ConfigError::Malformed)?;
    apply_default_policy(&mut document);
    Ok(document)
}

/// Read, parse and compile the JSON schema document.
pub fn load_schema(path: &Path) -> Result<Validator, ConfigError> {
    let unusable = |reason: String| ConfigError::SchemaUnusable {
        path: path.to_path_buf(),
        reason,
    };
    let content = fs::read_to_string(path).map_err(|e| unusable(e.to_string()))?;
    let schema: Value = serde_json::from_str(&content).map_err(|e| unusable(e.to_string()))?;
    jsonschema::validator_for(&schema).map_err(|e| unusable(e.to_string()))
}

/// Insert `{"behaviour": "error"}` when the document has no `default`.
pub fn apply_default_policy(document: &mut Value) {
    if let Some(root) = document.as_object_mut() {
        let missing = root.get("default").map_or(true, Value::is_null);
        if missing {
            root.insert("default".to_string(), json!({ "behaviour": "error" }));
        }
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ConfigError::Missing {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Unreadable {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}
