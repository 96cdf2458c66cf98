//! Reload orchestration.
//!
//! # Responsibilities
//! - Run validate → loop check → coverage check on each candidate
//! - Build the routing table and certificate store for accepted candidates
//! - Publish both as one snapshot, or leave the current one untouched
//!
//! # Design Decisions
//! - Single writer: reloads are serialized, requests are coalesced
//! - Blocking I/O (files, certificates) runs off the async workers
//! - A failed reload leaves no residual state; retrying is always safe

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tokio::sync::{broadcast, mpsc, watch, Notify};

use crate::config::validation::CoverageGap;
use crate::config::{self, ConfigError, ReloadRequest};
use crate::observability::metrics;
use crate::reload::snapshot::{ConfigSnapshot, SnapshotHandle};
use crate::tls::CertificateStore;

/// Where the controller is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadState {
    Idle,
    Validating,
    Accepted,
    Rejected,
}

/// Result of one reload attempt.
#[derive(Debug)]
pub enum ReloadOutcome {
    /// A new snapshot was published.
    Accepted {
        version: u64,
        warnings: Vec<CoverageGap>,
    },
    /// The candidate was refused; the previous snapshot stays current.
    Rejected(ConfigError),
    /// The hosts file does not exist; nothing was attempted.
    Skipped,
}

impl ReloadOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ReloadOutcome::Accepted { .. })
    }
}

/// Owns snapshot construction and publication.
pub struct ReloadController {
    snapshots: SnapshotHandle,
    config_path: PathBuf,
    schema_path: PathBuf,
    listen_port: u16,
    next_version: AtomicU64,
    writer: Mutex<()>,
    state: watch::Sender<ReloadState>,
    completed: Arc<Notify>,
}

impl ReloadController {
    /// Create a controller publishing into a fresh, empty snapshot cell.
    pub fn new(config_path: impl Into<PathBuf>, schema_path: impl Into<PathBuf>, listen_port: u16) -> Self {
        let (state, _) = watch::channel(ReloadState::Idle);
        Self {
            snapshots: SnapshotHandle::new(ConfigSnapshot::empty()),
            config_path: config_path.into(),
            schema_path: schema_path.into(),
            listen_port,
            next_version: AtomicU64::new(1),
            writer: Mutex::new(()),
            state,
            completed: Arc::new(Notify::new()),
        }
    }

    /// Read handle for dispatch and SNI resolution.
    pub fn snapshots(&self) -> SnapshotHandle {
        self.snapshots.clone()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Observe state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ReloadState> {
        self.state.subscribe()
    }

    /// Notified after every reload attempt, whatever its outcome.
    pub fn completed(&self) -> Arc<Notify> {
        Arc::clone(&self.completed)
    }

    /// Initial load. On failure the empty snapshot stays in place and the
    /// proxy answers every request with not-found.
    pub fn load_initial(&self) -> ReloadOutcome {
        let outcome = self.reload();
        if !outcome.is_accepted() {
            tracing::error!(
                path = ?self.config_path,
                "Failed to load hosts from file, starting with an empty routing table"
            );
        }
        outcome
    }

    /// Re-read the hosts file and try to publish it.
    pub fn reload(&self) -> ReloadOutcome {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        if !self.config_path.exists() {
            tracing::warn!(path = ?self.config_path, "Cannot find hosts file");
            metrics::record_reload("skipped");
            self.completed.notify_waiters();
            return ReloadOutcome::Skipped;
        }

        tracing::info!(path = ?self.config_path, "Attempting to reload config...");
        let outcome = self.process(config::load_document(&self.config_path));
        self.completed.notify_waiters();
        outcome
    }

    /// Validate and publish an already parsed document.
    pub fn apply_document(&self, mut document: Value) -> ReloadOutcome {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        config::loader::apply_default_policy(&mut document);
        let outcome = self.process(Ok(document));
        self.completed.notify_waiters();
        outcome
    }

    /// Serve reload requests until shutdown or until every sender is gone.
    pub async fn run(
        self: Arc<Self>,
        mut requests: mpsc::UnboundedReceiver<ReloadRequest>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::debug!("Reload loop stopping");
                    break;
                }
                request = requests.recv() => {
                    let Some(request) = request else { break };

                    // Collapse a burst of change events into one reload.
                    let mut coalesced = 0usize;
                    while requests.try_recv().is_ok() {
                        coalesced += 1;
                    }
                    tracing::debug!(path = ?request.path, coalesced, "Reload requested");

                    let controller = Arc::clone(&self);
                    if let Err(e) = tokio::task::spawn_blocking(move || controller.reload()).await {
                        tracing::error!(error = %e, "Reload task failed");
                    }
                }
            }
        }
    }

    fn process(&self, document: Result<Value, ConfigError>) -> ReloadOutcome {
        self.state.send_replace(ReloadState::Validating);

        let outcome = match document.and_then(|document| self.accept(&document)) {
            Ok((snapshot, warnings)) => {
                self.state.send_replace(ReloadState::Accepted);
                tracing::info!(
                    version = snapshot.version(),
                    routes = snapshot.routes().len(),
                    certificates = snapshot.certificates().len(),
                    tls = snapshot.tls_enabled(),
                    "Hosts have been updated"
                );
                metrics::record_reload("accepted");
                metrics::record_config_version(snapshot.version());
                ReloadOutcome::Accepted {
                    version: snapshot.version(),
                    warnings,
                }
            }
            Err(e) => {
                self.state.send_replace(ReloadState::Rejected);
                log_rejection(&e);
                metrics::record_reload("rejected");
                ReloadOutcome::Rejected(e)
            }
        };

        self.state.send_replace(ReloadState::Idle);
        outcome
    }

    fn accept(&self, candidate: &Value) -> Result<(Arc<ConfigSnapshot>, Vec<CoverageGap>), ConfigError> {
        let schema = config::load_schema(&self.schema_path)?;
        let validated = config::validate_candidate(candidate, &schema, self.listen_port)?;
        let document = validated.document;

        if document.tls_enabled() {
            for gap in &validated.warnings {
                tracing::warn!(host = %gap.host, "{}", gap);
            }
        } else {
            tracing::warn!("'https' not defined in config. Not using HTTPS");
        }

        let routes = document.routing_table(self.listen_port)?;
        let certificates = if document.tls_enabled() {
            let specs = document.cert_specs();
            let fallback = document.fallback_cert_spec();
            CertificateStore::build(&specs, fallback.as_ref())
        } else {
            CertificateStore::empty()
        };

        let version = self.next_version.fetch_add(1, Ordering::SeqCst);
        let snapshot = self
            .snapshots
            .publish(ConfigSnapshot::new(version, routes, certificates));
        Ok((snapshot, validated.warnings))
    }
}

fn log_rejection(error: &ConfigError) {
    match error {
        ConfigError::SchemaInvalid(violations) => {
            tracing::error!(count = violations.len(), "Hosts file is invalid");
            for violation in violations {
                tracing::error!(path = ?violation.path, "{}", violation);
            }
        }
        ConfigError::LoopDetected(e) => tracing::error!("{}", e),
        ConfigError::Malformed(e) => tracing::error!(error = %e, "Failed to parse hosts file"),
        other => tracing::error!(error = %other, "Hosts file rejected, keeping current configuration"),
    }
}
