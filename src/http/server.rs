//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with a single catch-all proxy route
//! - Wire up middleware (tracing, request ID, timeout, optional body limit)
//! - Bind server to listener
//! - Dispatch every request to the balancer
//!
//! Each request runs in its own task. If the client goes away the handler
//! future is dropped, which drops the in-flight upstream request with it.

use axum::{
    body::Body,
    extract::{Request, State},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::BalancerConfig;
use crate::load_balancer::Balancer;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub balancer: Arc<Balancer>,
}

/// HTTP front end of the load balancer.
pub struct HttpServer {
    router: Router,
    balancer: Arc<Balancer>,
}

impl HttpServer {
    /// Create a new HTTP server that forwards through `balancer`.
    pub fn new(balancer: Arc<Balancer>, config: &BalancerConfig) -> Self {
        let state = AppState {
            balancer: balancer.clone(),
        };
        let router = Self::build_router(config, state);
        Self { router, balancer }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &BalancerConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state);

        // Bodies are streamed through untouched unless a limit is configured.
        if let Some(limit) = config.limits.max_body_size {
            router = router.layer(RequestBodyLimitLayer::new(limit));
        }

        router
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// A clone of the fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backends = self.balancer.backends().len(),
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app).await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: every path and method goes to the balancer.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    match state.balancer.handle_request(request).await {
        Ok(response) => response,
        Err(err) => {
            tracing::error!(
                method = %method,
                path = %path,
                status = %err.status_code(),
                error = %err,
                "Proxy error"
            );
            err.into_response()
        }
    }
}
