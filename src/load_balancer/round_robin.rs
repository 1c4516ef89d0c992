//! Round-robin load balancing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use thiserror::Error;

use crate::config::BalancerConfig;
use crate::load_balancer::backend::{build_client, Backend, BackendError, HttpBackend};
use crate::load_balancer::ProxyError;

/// Errors raised by the balancer itself.
#[derive(Debug, Error)]
pub enum BalancerError {
    #[error("balancer requires at least one backend")]
    Empty,

    #[error("no backend available after checking {checked} backends")]
    NoBackendAvailable { checked: usize },

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Round-robin selector over a fixed, ordered backend list.
///
/// The cursor is bumped once per liveness check, so a skipped backend
/// consumes a slot just like a selected one.
#[derive(Debug)]
pub struct Balancer {
    port: u16,
    backends: Vec<Arc<dyn Backend>>,
    cursor: AtomicUsize,
}

impl Balancer {
    /// Create a balancer over `backends`. The list must not be empty.
    pub fn new(port: u16, backends: Vec<Arc<dyn Backend>>) -> Result<Self, BalancerError> {
        if backends.is_empty() {
            return Err(BalancerError::Empty);
        }
        Ok(Self {
            port,
            backends,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Build HTTP backends for every configured address.
    ///
    /// Fails on the first malformed address.
    pub fn from_config(config: &BalancerConfig) -> Result<Self, BalancerError> {
        let client = build_client(&config.timeouts)?;
        let upstream_timeout = Duration::from_secs(config.timeouts.upstream_secs);

        let backends = config
            .backends
            .iter()
            .map(|address| {
                let backend = HttpBackend::new(address, client.clone())?
                    .with_upstream_timeout(upstream_timeout);
                Ok(Arc::new(backend) as Arc<dyn Backend>)
            })
            .collect::<Result<Vec<_>, BackendError>>()?;

        Self::new(config.listener.port, backends)
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn backends(&self) -> &[Arc<dyn Backend>] {
        &self.backends
    }

    /// Current raw cursor value.
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }

    /// Pick the next live backend.
    ///
    /// Checks at most one full cycle; if every backend is down the call
    /// returns [`BalancerError::NoBackendAvailable`] instead of spinning.
    pub fn select_next(&self) -> Result<Arc<dyn Backend>, BalancerError> {
        let len = self.backends.len();

        for _ in 0..len {
            let index = self.cursor.fetch_add(1, Ordering::Relaxed) % len;
            let backend = &self.backends[index];
            if backend.is_alive() {
                return Ok(backend.clone());
            }
            tracing::debug!(address = backend.address(), index, "Skipping backend that is not alive");
        }

        Err(BalancerError::NoBackendAvailable { checked: len })
    }

    /// Select a backend and forward `request` to it.
    pub async fn handle_request(&self, request: Request<Body>) -> Result<Response<Body>, ProxyError> {
        let backend = self.select_next()?;
        tracing::info!(address = backend.address(), "Forwarding request");
        Ok(backend.forward(request).await?)
    }
}
