//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use hostbounce::http::{HttpBouncer, HttpServer};
use hostbounce::lifecycle::Shutdown;
use hostbounce::reload::ReloadController;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub const SCHEMA: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json");

/// Start a backend on an ephemeral port that answers every request with
/// `response`. Returns its port.
pub async fn start_mock_backend(response: &'static str) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;
                        let response_str = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            response.len(),
                            response
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    port
}

/// A proxy running in-process against a hosts file in a temp directory.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub controller: Arc<ReloadController>,
    pub shutdown: Shutdown,
    config_path: PathBuf,
    _dir: tempfile::TempDir,
}

impl TestProxy {
    /// Bind an ephemeral port, load `config` and start serving.
    pub async fn start(config: &Value) -> Self {
        Self::start_with(|_| config.clone()).await
    }

    /// Like `start`, with the config built from the proxy's own port.
    pub async fn start_with(config: impl FnOnce(u16) -> Value) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        write_config(&config_path, &config(addr.port()));

        let controller = Arc::new(ReloadController::new(config_path.clone(), SCHEMA, addr.port()));
        controller.load_initial();

        let shutdown = Shutdown::new();
        let server = HttpServer::new(controller.snapshots(), Arc::new(HttpBouncer::default()));
        let server_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            let _ = server.run(listener, server_shutdown).await;
        });

        Self {
            addr,
            controller,
            shutdown,
            config_path,
            _dir: dir,
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Send a GET with the given Host header.
    pub async fn get(&self, host: &str) -> reqwest::Response {
        client()
            .get(format!("http://{}/", self.addr))
            .header("Host", host)
            .send()
            .await
            .expect("Proxy unreachable")
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub fn write_config(path: &Path, config: &Value) {
    std::fs::write(path, serde_json::to_string_pretty(config).unwrap()).unwrap();
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
