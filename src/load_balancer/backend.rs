//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single upstream server
//! - Report liveness to the balancer
//! - Forward a request to the upstream and stream its response back

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{Body, HttpBody};
use axum::extract::ConnectInfo;
use axum::http::{Request, Response};
use http_body_util::LengthLimitError;
use thiserror::Error;
use url::Url;

use crate::config::TimeoutConfig;
use crate::http::request::{upstream_headers, upstream_url};
use crate::http::response::from_upstream;

/// Default deadline for an upstream to produce response headers.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors raised while turning a configured address into a backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("invalid backend address {address:?}: {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: url::ParseError,
    },

    #[error("backend address {address:?} uses unsupported scheme {scheme:?} (expected http or https)")]
    UnsupportedScheme { address: String, scheme: String },

    #[error("backend address {address:?} has no host")]
    MissingHost { address: String },

    #[error("failed to build upstream HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Errors raised while forwarding a single request.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("request body exceeds the configured limit")]
    BodyTooLarge,

    #[error("upstream {address} did not respond within {timeout:?}")]
    Timeout { address: String, timeout: Duration },

    #[error("upstream {address} request failed: {source}")]
    Transport {
        address: String,
        #[source]
        source: reqwest::Error,
    },
}

/// An upstream target the balancer can hand a request to.
#[async_trait]
pub trait Backend: Send + Sync + fmt::Debug {
    /// The configured upstream address. Never changes.
    fn address(&self) -> &str;

    /// Whether this backend may receive traffic.
    fn is_alive(&self) -> bool;

    /// Relay `request` to the upstream and return its response.
    async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, ForwardError>;
}

/// Parse and check a backend address.
pub fn parse_address(address: &str) -> Result<Url, BackendError> {
    let url = Url::parse(address).map_err(|source| BackendError::InvalidAddress {
        address: address.to_string(),
        source,
    })?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(BackendError::UnsupportedScheme {
                address: address.to_string(),
                scheme: scheme.to_string(),
            })
        }
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(BackendError::MissingHost {
            address: address.to_string(),
        });
    }

    Ok(url)
}

/// Build the HTTP client shared by every backend.
///
/// Redirects are relayed to the caller rather than followed.
pub fn build_client(timeouts: &TimeoutConfig) -> Result<reqwest::Client, BackendError> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(timeouts.connect_secs))
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .map_err(BackendError::Client)
}

/// A backend reached over HTTP(S).
pub struct HttpBackend {
    address: String,
    url: Url,
    alive: AtomicBool,
    client: reqwest::Client,
    upstream_timeout: Duration,
}

impl HttpBackend {
    /// Create a backend for `address`, sharing `client`'s connection pool.
    pub fn new(address: &str, client: reqwest::Client) -> Result<Self, BackendError> {
        let url = parse_address(address)?;
        Ok(Self {
            address: address.to_string(),
            url,
            alive: AtomicBool::new(true),
            client,
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
        })
    }

    pub fn with_upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout = timeout;
        self
    }

    /// Mark the backend up or down.
    ///
    /// Nothing in the proxy calls this on its own; there is no probing.
    pub fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::Relaxed);
    }
}

impl fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBackend")
            .field("address", &self.address)
            .field("url", &self.url.as_str())
            .field("alive", &self.is_alive())
            .field("upstream_timeout", &self.upstream_timeout)
            .finish()
    }
}

#[async_trait]
impl Backend for HttpBackend {
    fn address(&self) -> &str {
        &self.address
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, ForwardError> {
        let (parts, body) = request.into_parts();

        let client_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        let url = upstream_url(&self.url, &parts.uri);
        let headers = upstream_headers(&parts.headers, client_addr);

        tracing::debug!(
            method = %parts.method,
            url = %url,
            streamed = !body.is_end_stream(),
            "Sending upstream request"
        );

        let mut builder = self.client.request(parts.method, url).headers(headers);
        // Empty bodies go out without framing so bodiless GETs stay plain.
        if !body.is_end_stream() {
            builder = builder.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let upstream = match tokio::time::timeout(self.upstream_timeout, builder.send()).await {
            Ok(Ok(upstream)) => upstream,
            Ok(Err(source)) if source.is_timeout() => {
                return Err(ForwardError::Timeout {
                    address: self.address.clone(),
                    timeout: self.upstream_timeout,
                })
            }
            Ok(Err(source)) if exceeded_body_limit(&source) => {
                return Err(ForwardError::BodyTooLarge)
            }
            Ok(Err(source)) => {
                return Err(ForwardError::Transport {
                    address: self.address.clone(),
                    source,
                })
            }
            Err(_) => {
                return Err(ForwardError::Timeout {
                    address: self.address.clone(),
                    timeout: self.upstream_timeout,
                })
            }
        };

        Ok(from_upstream(upstream))
    }
}

/// Whether a failed send was caused by the inbound body outgrowing the
/// router's body limit while it was being streamed.
fn exceeded_body_limit(error: &reqwest::Error) -> bool {
    let mut source = std::error::Error::source(error);
    while let Some(err) = source {
        if err.is::<LengthLimitError>() {
            return true;
        }
        source = std::error::Error::source(err);
    }
    false
}
