//! Forwarding to backend ports.
//!
//! The dispatch entry point only decides a destination port; a `Bouncer`
//! carries the request there and hands back the backend's response.

use axum::body::Body;
use axum::http::{header, uri::PathAndQuery, HeaderValue, Request, Uri, Version};
use axum::response::Response;
use futures_util::future::BoxFuture;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

/// Error type for forwarding.
#[derive(Debug, Error)]
pub enum BounceError {
    #[error("invalid upstream uri: {0}")]
    Uri(#[from] axum::http::Error),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),
}

/// Forwards an accepted request to a local port.
pub trait Bouncer: Send + Sync {
    fn bounce(&self, port: u16, request: Request<Body>) -> BoxFuture<'static, Result<Response, BounceError>>;
}

/// Bouncer that replays the request over HTTP/1.1 to `upstream_host:port`.
#[derive(Clone)]
pub struct HttpBouncer {
    client: Client<HttpConnector, Body>,
    upstream_host: String,
}

impl HttpBouncer {
    pub fn new(upstream_host: impl Into<String>) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            upstream_host: upstream_host.into(),
        }
    }
}

impl Default for HttpBouncer {
    fn default() -> Self {
        Self::new("127.0.0.1")
    }
}

impl Bouncer for HttpBouncer {
    fn bounce(&self, port: u16, request: Request<Body>) -> BoxFuture<'static, Result<Response, BounceError>> {
        let client = self.client.clone();
        let upstream = format!("{}:{}", self.upstream_host, port);

        Box::pin(async move {
            let (mut parts, body) = request.into_parts();

            // HTTP/2 clients carry the host in the authority only.
            if !parts.headers.contains_key(header::HOST) {
                if let Some(authority) = parts.uri.authority() {
                    if let Ok(value) = HeaderValue::from_str(authority.as_str()) {
                        parts.headers.insert(header::HOST, value);
                    }
                }
            }

            let path_and_query = parts
                .uri
                .path_and_query()
                .cloned()
                .unwrap_or_else(|| PathAndQuery::from_static("/"));
            parts.uri = Uri::builder()
                .scheme("http")
                .authority(upstream.as_str())
                .path_and_query(path_and_query)
                .build()?;
            parts.version = Version::HTTP_11;

            let response = client.request(Request::from_parts(parts, body)).await?;
            let (parts, body) = response.into_parts();
            Ok(Response::from_parts(parts, Body::new(body)))
        })
    }
}
