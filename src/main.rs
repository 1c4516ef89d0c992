//! Round-robin HTTP load balancer.
//!
//! Listens on a single port and forwards every request to the next live
//! backend in a fixed, ordered pool.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request        ┌──────────────────────────────────────────────┐
//!     ──────────────────────┼─▶ http::server ──▶ load_balancer::Balancer   │
//!                           │   (catch-all)       select_next()            │
//!                           │                          │                   │
//!     Client Response       │                          ▼                   │
//!     ◀─────────────────────┼── http::response ◀── Backend::forward ◀──────┼──── Backend
//!                           └──────────────────────────────────────────────┘     Server
//! ```

use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use round_robin_proxy::config::{validate_config, BalancerConfig, LogFormat};
use round_robin_proxy::observability::logging;
use round_robin_proxy::{Balancer, HttpServer};

#[derive(Parser)]
#[command(name = "round-robin-proxy")]
#[command(version)]
#[command(about = "Minimal round-robin HTTP load balancer", long_about = None)]
struct Cli {
    /// Interface to listen on
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8000)]
    port: u16,

    /// Backend base URL; repeat to build the pool (replaces the built-in list)
    #[arg(short = 'b', long = "backend", value_name = "URL")]
    backends: Vec<String>,

    /// Upstream connect timeout in seconds
    #[arg(long, default_value_t = 5)]
    connect_timeout_secs: u64,

    /// Seconds an upstream has to return response headers
    #[arg(long, default_value_t = 30)]
    upstream_timeout_secs: u64,

    /// Overall inbound request timeout in seconds
    #[arg(long, default_value_t = 60)]
    request_timeout_secs: u64,

    /// Reject request bodies larger than this many bytes (no limit by default)
    #[arg(long, value_name = "BYTES")]
    max_body_size: Option<usize>,

    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", value_name = "LEVEL")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

impl Cli {
    fn into_config(self) -> BalancerConfig {
        let mut config = BalancerConfig::with_default_backends();
        config.listener.host = self.host;
        config.listener.port = self.port;
        if !self.backends.is_empty() {
            config.backends = self.backends;
        }
        config.timeouts.connect_secs = self.connect_timeout_secs;
        config.timeouts.upstream_secs = self.upstream_timeout_secs;
        config.timeouts.request_secs = self.request_timeout_secs;
        config.limits.max_body_size = self.max_body_size;
        config.observability.log_level = self.log_level;
        config.observability.log_format = self.log_format;
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config();

    logging::init(&config.observability);

    tracing::info!("round-robin-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    // Any configuration problem is fatal before the listener is bound.
    if let Err(errors) = validate_config(&config) {
        for error in &errors {
            tracing::error!(error = %error, "Invalid configuration");
        }
        std::process::exit(1);
    }

    let balancer = match Balancer::from_config(&config) {
        Ok(balancer) => balancer,
        Err(error) => {
            tracing::error!(error = %error, "Failed to build backend pool");
            std::process::exit(1);
        }
    };

    tracing::info!(
        backends = ?config.backends,
        request_timeout_secs = config.timeouts.request_secs,
        upstream_timeout_secs = config.timeouts.upstream_secs,
        "Configuration loaded"
    );

    let listener = TcpListener::bind((config.listener.host.as_str(), balancer.port())).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        "Server is serving requests"
    );

    let server = HttpServer::new(Arc::new(balancer), &config);
    server.run(listener).await?;

    Ok(())
}
