//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (schema.rs)
//!     → command-line overrides (main.rs)
//!     → validation.rs (semantic checks)
//!     → BalancerConfig (validated, immutable)
//!     → consumed once to build the Balancer and HttpServer
//! ```
//!
//! # Design Decisions
//! - Config is immutable once validated; there is no reload
//! - All fields have defaults so the binary runs with no flags
//! - Validation reports every problem before the process exits

pub mod schema;
pub mod validation;

pub use schema::BalancerConfig;
pub use schema::LimitsConfig;
pub use schema::ListenerConfig;
pub use schema::LogFormat;
pub use schema::ObservabilityConfig;
pub use schema::TimeoutConfig;
pub use validation::{validate_config, ValidationError};
