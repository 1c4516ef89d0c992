//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, catch-all route)
//!     → [load balancer picks a backend]
//!     → request.rs (URL join, hop-by-hop removal, X-Forwarded-*)
//!     → upstream call
//!     → response.rs (relay status/headers/body, map errors)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use server::HttpServer;
