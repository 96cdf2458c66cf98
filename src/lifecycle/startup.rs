//! Startup orchestration.
//!
//! # Responsibilities
//! - Load the initial configuration (empty table on failure)
//! - Start the hosts file watcher and the reload loop
//! - Bind the listener and serve plaintext or TLS until shutdown

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ConfigWatcher;
use crate::http::{HttpBouncer, HttpServer};
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;
use crate::reload::ReloadController;
use crate::tls::{self, SniResolver};

/// Process-level settings, supplied by flags or environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_ip: IpAddr,
    pub port: u16,
    pub hosts_file: PathBuf,
    pub schema_file: PathBuf,
    pub upstream_host: String,
    pub metrics_address: Option<SocketAddr>,
}

impl Settings {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }
}

/// Fatal startup failures.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: std::io::Error },

    #[error("failed to build TLS configuration: {0}")]
    Tls(#[from] rustls::Error),

    #[error("server error: {0}")]
    Serve(std::io::Error),
}

/// Run the proxy until a shutdown signal.
pub async fn run(settings: Settings) -> Result<(), StartupError> {
    if let Some(addr) = settings.metrics_address {
        if let Err(e) = metrics::init_metrics(addr) {
            tracing::error!(metrics_address = %addr, error = %e, "Failed to start metrics endpoint");
        }
    }

    let controller = Arc::new(ReloadController::new(
        settings.hosts_file.clone(),
        settings.schema_file.clone(),
        settings.port,
    ));
    let initial = tokio::task::spawn_blocking({
        let controller = Arc::clone(&controller);
        move || controller.load_initial()
    })
    .await
    .map_err(|e| StartupError::Serve(std::io::Error::other(e)))?;
    tracing::debug!(?initial, "Initial configuration processed");

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(&shutdown);

    let (watcher, requests) = ConfigWatcher::new(&settings.hosts_file);
    let _watcher = match watcher.run() {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            tracing::error!(path = ?settings.hosts_file, error = %e, "Failed to watch hosts file, hot reload disabled");
            None
        }
    };
    tokio::spawn(Arc::clone(&controller).run(requests, shutdown.subscribe()));

    let snapshots = controller.snapshots();
    let server = HttpServer::new(snapshots.clone(), Arc::new(HttpBouncer::new(settings.upstream_host.clone())));
    let addr = settings.listen_addr();

    if snapshots.load().tls_enabled() {
        let tls = tls::server_config(SniResolver::new(snapshots))?;
        let listener = std::net::TcpListener::bind(addr).map_err(|source| StartupError::Bind { addr, source })?;
        tracing::info!(address = %addr, "Bouncer listening with TLS");
        server
            .run_tls(listener, tls, shutdown.subscribe())
            .await
            .map_err(StartupError::Serve)?;
    } else {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| StartupError::Bind { addr, source })?;
        tracing::info!(address = %addr, "Bouncer listening");
        server
            .run(listener, shutdown.subscribe())
            .await
            .map_err(StartupError::Serve)?;
    }

    shutdown.trigger();
    Ok(())
}
