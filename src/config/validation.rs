//! Configuration validation.
//!
//! # Responsibilities
//! - Check every backend address parses as an http(s) URL with a host
//! - Validate value ranges (timeouts > 0, body limit > 0 when set)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BalancerConfig → Result<(), Vec<ValidationError>>
//! - Runs before the listener is bound; any error is fatal at startup

use thiserror::Error;

use crate::config::BalancerConfig;
use crate::load_balancer::backend::{parse_address, BackendError};

/// A single semantic problem in the configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("at least one backend must be configured")]
    NoBackends,

    #[error("backend #{index}: {source}")]
    Backend {
        index: usize,
        #[source]
        source: BackendError,
    },

    #[error("{field} must be greater than zero")]
    ZeroValue { field: &'static str },
}

/// Validate the configuration, collecting every error found.
pub fn validate_config(config: &BalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.backends.is_empty() {
        errors.push(ValidationError::NoBackends);
    }

    for (index, address) in config.backends.iter().enumerate() {
        if let Err(source) = parse_address(address) {
            errors.push(ValidationError::Backend { index, source });
        }
    }

    let positive = [
        ("timeouts.connect_secs", config.timeouts.connect_secs),
        ("timeouts.upstream_secs", config.timeouts.upstream_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::ZeroValue { field });
        }
    }

    if config.limits.max_body_size == Some(0) {
        errors.push(ValidationError::ZeroValue {
            field: "limits.max_body_size",
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
