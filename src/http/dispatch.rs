//! Per-request dispatch.
//!
//! # Responsibilities
//! - Extract the requested hostname (Host header, else URI authority)
//! - Resolve it against the current snapshot
//! - Bounce to the resolved port or answer 404
//!
//! # Design Decisions
//! - The snapshot is loaded once per request, never cached across requests
//! - Not-found is a client-facing outcome, logged at info, not as an error
//! - Each request is counted once, under its final outcome

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::http::bounce::Bouncer;
use crate::observability::metrics;
use crate::reload::SnapshotHandle;
use crate::routing::RouteDecision;

/// Routes requests using the current snapshot.
#[derive(Clone)]
pub struct Dispatcher {
    snapshots: SnapshotHandle,
    bouncer: Arc<dyn Bouncer>,
}

impl Dispatcher {
    pub fn new(snapshots: SnapshotHandle, bouncer: Arc<dyn Bouncer>) -> Self {
        Self { snapshots, bouncer }
    }

    /// Routing decision for `hostname` against the current snapshot.
    pub fn decide(&self, hostname: &str) -> RouteDecision {
        self.snapshots.load().routes().resolve(hostname)
    }

    /// Handle one request end to end.
    pub async fn dispatch(&self, request: Request<Body>) -> Response {
        let hostname = request_host(&request).unwrap_or_default();
        tracing::info!(host = %hostname, "Request to host");

        let (port, outcome) = match self.decide(&hostname) {
            RouteDecision::Matched(port) => (port, "matched"),
            RouteDecision::Default(port) => {
                tracing::info!(host = %hostname, "Host is not in hosts list, using default bounce");
                (port, "default")
            }
            RouteDecision::NotFound => {
                tracing::info!(host = %hostname, "Host is not in hosts list, sent 404");
                metrics::record_request("not_found");
                return not_found();
            }
        };

        match self.bouncer.bounce(port, request).await {
            Ok(response) => {
                tracing::info!(host = %hostname, port, status = %response.status(), "Bounced to port");
                metrics::record_request(outcome);
                response
            }
            Err(e) => {
                tracing::error!(host = %hostname, port, error = %e, "Bounce failed");
                metrics::record_request("upstream_error");
                StatusCode::BAD_GATEWAY.into_response()
            }
        }
    }
}

/// Empty 404 that also ends the client connection.
fn not_found() -> Response {
    (StatusCode::NOT_FOUND, [(header::CONNECTION, "close")]).into_response()
}

/// Hostname the client asked for, without any port suffix.
pub fn request_host(request: &Request<Body>) -> Option<String> {
    let from_header = request
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(strip_port);

    from_header
        .or_else(|| request.uri().host())
        .filter(|host| !host.is_empty())
        .map(str::to_string)
}

fn strip_port(authority: &str) -> &str {
    if authority.starts_with('[') {
        // IPv6 literal: keep up to and including the closing bracket.
        return match authority.find(']') {
            Some(end) => &authority[..=end],
            None => authority,
        };
    }
    match authority.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => host,
        _ => authority,
    }
}
