//! Round-robin HTTP load balancer library.

pub mod config;
pub mod http;
pub mod load_balancer;
pub mod observability;

pub use config::BalancerConfig;
pub use http::HttpServer;
pub use load_balancer::{Backend, Balancer, HttpBackend};
