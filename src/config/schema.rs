//! Configuration schema definitions.
//!
//! The balancer is configured once at startup. Every field has a default so
//! the binary runs with no flags at all; `main.rs` overlays command-line
//! overrides on top of [`BalancerConfig::with_default_backends`].

/// Root configuration for the load balancer.
#[derive(Debug, Clone, Default)]
pub struct BalancerConfig {
    /// Listener configuration (bind host and port).
    pub listener: ListenerConfig,

    /// Ordered backend base URLs. Order is the round-robin order.
    pub backends: Vec<String>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl BalancerConfig {
    /// Default configuration with the built-in backend pool.
    pub fn with_default_backends() -> Self {
        Self {
            backends: default_backends(),
            ..Self::default()
        }
    }
}

/// The pool used when no `--backend` flag is given.
fn default_backends() -> Vec<String> {
    vec![
        "https://www.google.com".to_string(),
        "https://www.bing.com".to_string(),
        "https://www.duckduckgo.com".to_string(),
        "https://www.search.brave.com".to_string(),
    ]
}

/// Listener configuration.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// Port to bind. 0 asks the OS for an ephemeral port.
    pub port: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Time allowed for an upstream to return response headers, in seconds.
    pub upstream_secs: u64,

    /// Overall inbound request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 30,
            request_secs: 60,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Default)]
pub struct LimitsConfig {
    /// Maximum request body size in bytes. `None` forwards bodies of any
    /// size.
    pub max_body_size: Option<usize>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}
