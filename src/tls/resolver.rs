//! SNI certificate selection.

use std::sync::Arc;

use rustls::server::{ClientHello, ResolvesServerCert};
use rustls::sign::CertifiedKey;
use rustls::ServerConfig;

use crate::reload::SnapshotHandle;

/// Picks the server certificate from the current snapshot for each handshake.
#[derive(Debug, Clone)]
pub struct SniResolver {
    snapshots: SnapshotHandle,
}

impl SniResolver {
    pub fn new(snapshots: SnapshotHandle) -> Self {
        Self { snapshots }
    }

    /// Resolve a client-requested name, falling back to the snapshot's
    /// fallback certificate.
    pub fn resolve_name(&self, server_name: Option<&str>) -> Option<Arc<CertifiedKey>> {
        let snapshot = self.snapshots.load();
        let certs = snapshot.certificates();

        let resolved = server_name.and_then(|name| certs.resolve(name));
        if resolved.is_some() {
            return resolved;
        }

        tracing::debug!(
            server_name = server_name.unwrap_or("<none>"),
            version = snapshot.version(),
            "No certificate for SNI name, using fallback"
        );
        certs.fallback()
    }
}

impl ResolvesServerCert for SniResolver {
    fn resolve(&self, client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        self.resolve_name(client_hello.server_name())
    }
}

/// Build a rustls server configuration bound to `resolver`.
pub fn server_config(resolver: SniResolver) -> Result<ServerConfig, rustls::Error> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_cert_resolver(Arc::new(resolver));
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
    Ok(config)
}
