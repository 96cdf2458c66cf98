//! Per-host certificate store.
//!
//! # Responsibilities
//! - Load key, certificate and CA chain files for each configured host
//! - Keep hosts whose files fail to load out of the store
//! - Hold the fallback certificate used when SNI resolution finds nothing
//!
//! # Design Decisions
//! - Parsed once per reload; no I/O during handshakes
//! - Keyed by the exact configured hostname, no pattern matching
//! - A bad certificate for one host never aborts the whole build

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::pki_types::CertificateDer;
use rustls::sign::CertifiedKey;
use thiserror::Error;

use crate::config::CertPaths;
use crate::observability::metrics;

/// Certificate files for one hostname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertSpec {
    pub hostname: String,
    pub key_path: PathBuf,
    pub cert_path: PathBuf,
    pub ca_paths: Vec<PathBuf>,
}

impl CertSpec {
    pub fn new(hostname: impl Into<String>, paths: &CertPaths) -> Self {
        Self {
            hostname: hostname.into(),
            key_path: paths.key.clone(),
            cert_path: paths.cert.clone(),
            ca_paths: paths.ca.clone(),
        }
    }
}

/// Error type for certificate loading.
#[derive(Debug, Error)]
pub enum CertError {
    #[error("failed to read {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("no certificates found in {path:?}")]
    NoCertificates { path: PathBuf },

    #[error("no private key found in {path:?}")]
    NoPrivateKey { path: PathBuf },

    #[error("unsupported private key in {path:?}: {source}")]
    InvalidKey { path: PathBuf, source: rustls::Error },
}

/// Immutable hostname → certificate mapping for one config version.
#[derive(Clone, Default)]
pub struct CertificateStore {
    contexts: HashMap<String, Arc<CertifiedKey>>,
    fallback: Option<Arc<CertifiedKey>>,
    tls_enabled: bool,
}

impl std::fmt::Debug for CertificateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut hosts: Vec<&String> = self.contexts.keys().collect();
        hosts.sort();
        f.debug_struct("CertificateStore")
            .field("hosts", &hosts)
            .field("fallback", &self.fallback.is_some())
            .field("tls_enabled", &self.tls_enabled)
            .finish()
    }
}

impl CertificateStore {
    /// A store for plaintext operation.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load every spec, skipping (and logging) the ones that fail.
    ///
    /// `fallback` is loaded the same way; when it names a host already in
    /// `specs` the loaded context is shared.
    pub fn build(specs: &[CertSpec], fallback: Option<&CertSpec>) -> Self {
        let mut contexts = HashMap::new();

        for spec in specs {
            match load_certified_key(spec) {
                Ok(key) => {
                    tracing::debug!(host = %spec.hostname, cert = ?spec.cert_path, "Certificate loaded");
                    contexts.insert(spec.hostname.clone(), Arc::new(key));
                }
                Err(e) => {
                    tracing::error!(host = %spec.hostname, error = %e, "Failed to get SSL certificate for host");
                    metrics::record_cert_failure();
                }
            }
        }

        let fallback = fallback.and_then(|spec| {
            // Already attempted above; a failure there is not retried.
            if specs.contains(spec) {
                return contexts.get(&spec.hostname).cloned();
            }
            match load_certified_key(spec) {
                Ok(key) => Some(Arc::new(key)),
                Err(e) => {
                    tracing::error!(host = %spec.hostname, error = %e, "Failed to load fallback certificate");
                    metrics::record_cert_failure();
                    None
                }
            }
        });

        Self {
            contexts,
            fallback,
            tls_enabled: true,
        }
    }

    /// Certificate configured for exactly `hostname`.
    pub fn resolve(&self, hostname: &str) -> Option<Arc<CertifiedKey>> {
        self.contexts.get(hostname).cloned()
    }

    /// Certificate served when the client's name has no entry.
    pub fn fallback(&self) -> Option<Arc<CertifiedKey>> {
        self.fallback.clone()
    }

    /// Whether the configuration this store was built from enables TLS.
    pub fn tls_enabled(&self) -> bool {
        self.tls_enabled
    }

    pub fn contains(&self, hostname: &str) -> bool {
        self.contexts.contains_key(hostname)
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

/// Load a certificate chain (leaf first, then CA files) and private key.
pub fn load_certified_key(spec: &CertSpec) -> Result<CertifiedKey, CertError> {
    let key_pem = read(&spec.key_path)?;
    let cert_pem = read(&spec.cert_path)?;

    let mut chain = parse_certs(&spec.cert_path, &cert_pem)?;
    if chain.is_empty() {
        return Err(CertError::NoCertificates {
            path: spec.cert_path.clone(),
        });
    }
    for ca_path in &spec.ca_paths {
        let ca_pem = read(ca_path)?;
        chain.extend(parse_certs(ca_path, &ca_pem)?);
    }

    let key = rustls_pemfile::private_key(&mut key_pem.as_slice())
        .map_err(|source| CertError::Read {
            path: spec.key_path.clone(),
            source,
        })?
        .ok_or_else(|| CertError::NoPrivateKey {
            path: spec.key_path.clone(),
        })?;

    let signing_key = rustls::crypto::ring::sign::any_supported_type(&key).map_err(|source| {
        CertError::InvalidKey {
            path: spec.key_path.clone(),
            source,
        }
    })?;

    Ok(CertifiedKey::new(chain, signing_key))
}

fn read(path: &Path) -> Result<Vec<u8>, CertError> {
    fs::read(path).map_err(|source| CertError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_certs(path: &Path, pem: &[u8]) -> Result<Vec<CertificateDer<'static>>, CertError> {
    rustls_pemfile::certs(&mut &pem[..])
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| CertError::Read {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::path::Path;

    fn write_cert(dir: &Path, host: &str) -> CertSpec {
        let generated = rcgen::generate_simple_self_signed(vec![host.to_string()]).unwrap();
        let cert_path = dir.join(format!("{}.pem", host));
        let key_path = dir.join(format!("{}.key", host));
        fs::write(&cert_path, generated.cert.pem()).unwrap();
        fs::write(&key_path, generated.key_pair.serialize_pem()).unwrap();
        CertSpec {
            hostname: host.to_string(),
            key_path,
            cert_path,
            ca_paths: Vec::new(),
        }
    }

    #[test]
    fn test_load_valid_certificate() {
        let dir = tempfile::tempdir().unwrap();
        let spec = write_cert(dir.path(), "a.example.com");
        let key = load_certified_key(&spec).unwrap();
        assert_eq!(key.cert.len(), 1);
    }

    #[test]
    fn test_ca_files_extend_chain() {
        let dir = tempfile::tempdir().unwrap();
        let mut spec = write_cert(dir.path(), "a.example.com");
        let ca = write_cert(dir.path(), "ca.example.com");
        spec.ca_paths = vec![ca.cert_path];
        let key = load_certified_key(&spec).unwrap();
        assert_eq!(key.cert.len(), 2);
    }

    #[test]
    fn test_missing_ca_file_fails_host() {
        let dir = tempfile::tempdir().unwrap();
        let mut spec = write_cert(dir.path(), "a.example.com");
        spec.ca_paths = vec![dir.path().join("missing-ca.pem")];
        assert!(matches!(load_certified_key(&spec), Err(CertError::Read { .. })));
    }

    #[test]
    fn test_one_bad_host_does_not_block_others() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_cert(dir.path(), "b.example.com");
        let missing = CertSpec {
            hostname: "a.example.com".into(),
            key_path: dir.path().join("nope.key"),
            cert_path: dir.path().join("nope.pem"),
            ca_paths: Vec::new(),
        };
        let garbage_path = dir.path().join("garbage.pem");
        fs::write(&garbage_path, "not a certificate").unwrap();
        let garbage = CertSpec {
            hostname: "c.example.com".into(),
            key_path: good.key_path.clone(),
            cert_path: garbage_path,
            ca_paths: Vec::new(),
        };

        let store = CertificateStore::build(&[missing, good, garbage], None);
        assert_eq!(store.len(), 1);
        assert!(store.contains("b.example.com"));
        assert!(store.resolve("a.example.com").is_none());
        assert!(store.resolve("c.example.com").is_none());
        assert!(store.tls_enabled());
    }

    #[test]
    fn test_resolve_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let spec = write_cert(dir.path(), "a.example.com");
        let store = CertificateStore::build(&[spec], None);
        assert!(store.resolve("a.example.com").is_some());
        assert!(store.resolve("A.example.com").is_none());
        assert!(store.resolve("x.a.example.com").is_none());
    }

    #[test]
    fn test_fallback_shared_with_host() {
        let dir = tempfile::tempdir().unwrap();
        let spec = write_cert(dir.path(), "a.example.com");
        let store = CertificateStore::build(std::slice::from_ref(&spec), Some(&spec));
        let host = store.resolve("a.example.com").unwrap();
        let fallback = store.fallback().unwrap();
        assert!(Arc::ptr_eq(&host, &fallback));
    }

    #[test]
    fn test_fallback_loaded_separately() {
        let dir = tempfile::tempdir().unwrap();
        let wildcard = write_cert(dir.path(), "wild.example.com");
        let store = CertificateStore::build(&[], Some(&wildcard));
        assert!(store.is_empty());
        assert!(store.fallback().is_some());
    }

    #[test]
    fn test_empty_store_is_plaintext() {
        let store = CertificateStore::empty();
        assert!(!store.tls_enabled());
        assert!(store.fallback().is_none());
    }

    #[test]
    fn test_failed_fallback_host_not_loaded_twice() {
        let dir = tempfile::tempdir().unwrap();
        let mut broken = write_cert(dir.path(), "a.example.com");
        broken.key_path = dir.path().join("missing.key");

        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let store = ::metrics::with_local_recorder(&recorder, || {
            CertificateStore::build(std::slice::from_ref(&broken), Some(&broken))
        });

        assert!(store.fallback().is_none());
        assert!(handle.render().contains("hostbounce_cert_failures_total 1"));
    }
}
