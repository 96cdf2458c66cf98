//! Published configuration snapshots.
//!
//! A snapshot pairs one routing table with the certificate store built
//! from the same document. Readers load the current `Arc` per lookup; the
//! reload controller replaces it with a single atomic store.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::routing::RoutingTable;
use crate::tls::CertificateStore;

/// One internally consistent config version.
#[derive(Debug)]
pub struct ConfigSnapshot {
    version: u64,
    routes: RoutingTable,
    certificates: CertificateStore,
}

impl ConfigSnapshot {
    pub fn new(version: u64, routes: RoutingTable, certificates: CertificateStore) -> Self {
        Self {
            version,
            routes,
            certificates,
        }
    }

    /// Version 0: no routes, default `Error`, plaintext.
    pub fn empty() -> Self {
        Self::new(0, RoutingTable::empty(), CertificateStore::empty())
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn routes(&self) -> &RoutingTable {
        &self.routes
    }

    pub fn certificates(&self) -> &CertificateStore {
        &self.certificates
    }

    pub fn tls_enabled(&self) -> bool {
        self.certificates.tls_enabled()
    }
}

/// Shared cell holding the current snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotHandle {
    current: Arc<ArcSwap<ConfigSnapshot>>,
}

impl SnapshotHandle {
    pub fn new(initial: ConfigSnapshot) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(initial)),
        }
    }

    /// The snapshot current at the time of the call.
    pub fn load(&self) -> Arc<ConfigSnapshot> {
        self.current.load_full()
    }

    /// Replace the current snapshot. Only the reload controller publishes
    /// outside of tests.
    pub(crate) fn publish(&self, snapshot: ConfigSnapshot) -> Arc<ConfigSnapshot> {
        let snapshot = Arc::new(snapshot);
        self.current.store(Arc::clone(&snapshot));
        snapshot
    }
}
