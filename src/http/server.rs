//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the dispatch handler on every path
//! - Wire up tracing middleware
//! - Serve plaintext on a bound listener, or TLS with SNI certificate selection
//! - Stop on the shutdown broadcast

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use rustls::ServerConfig;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::http::bounce::Bouncer;
use crate::http::dispatch::Dispatcher;
use crate::reload::SnapshotHandle;

/// Grace period for in-flight requests once TLS shutdown starts.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP front end of the proxy.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a server dispatching against `snapshots`.
    pub fn new(snapshots: SnapshotHandle, bouncer: Arc<dyn Bouncer>) -> Self {
        let dispatcher = Dispatcher::new(snapshots, bouncer);
        Self {
            router: Self::build_router(dispatcher),
        }
    }

    fn build_router(dispatcher: Dispatcher) -> Router {
        Router::new()
            .route("/{*path}", any(dispatch_handler))
            .route("/", any(dispatch_handler))
            .with_state(dispatcher)
            .layer(TraceLayer::new_for_http())
    }

    /// The routing service, for embedding or in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve plaintext HTTP until shutdown.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, tls = false, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve HTTPS on a bound listener until shutdown.
    pub async fn run_tls(
        self,
        listener: std::net::TcpListener,
        tls: ServerConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        listener.set_nonblocking(true)?;
        tracing::info!(address = %addr, tls = true, "HTTP server starting");

        let handle = axum_server::Handle::new();
        let stopper = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            stopper.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum_server::from_tcp_rustls(listener, RustlsConfig::from_config(Arc::new(tls)))
            .handle(handle)
            .serve(app)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn dispatch_handler(State(dispatcher): State<Dispatcher>, request: Request<Body>) -> Response {
    dispatcher.dispatch(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::bounce::BounceError;
    use crate::reload::ConfigSnapshot;
    use crate::routing::{DefaultPolicy, RoutingTable};
    use crate::tls::CertificateStore;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use futures_util::future::BoxFuture;
    use tower::ServiceExt;

    struct Fixed;

    impl Bouncer for Fixed {
        fn bounce(&self, port: u16, request: Request<Body>) -> BoxFuture<'static, Result<Response, BounceError>> {
            let path = request.uri().path().to_string();
            Box::pin(async move { Ok(format!("{} {}", port, path).into_response()) })
        }
    }

    fn server() -> HttpServer {
        let routes = RoutingTable::new([("a.example.com", 9001)], DefaultPolicy::Error, 8080).unwrap();
        let handle = SnapshotHandle::new(ConfigSnapshot::new(1, routes, CertificateStore::empty()));
        HttpServer::new(handle, Arc::new(Fixed))
    }

    #[tokio::test]
    async fn test_every_path_is_dispatched() {
        for path in ["/", "/deep/nested/path"] {
            let request = Request::builder()
                .uri(path)
                .header("Host", "a.example.com")
                .body(Body::empty())
                .unwrap();
            let response = server().router().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
            assert_eq!(body, format!("9001 {}", path).as_bytes());
        }
    }

    #[tokio::test]
    async fn test_unknown_host_404() {
        let request = Request::builder()
            .uri("/")
            .header("Host", "nope.example.com")
            .body(Body::empty())
            .unwrap();
        let response = server().router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
