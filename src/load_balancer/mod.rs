//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → round_robin.rs (Balancer::select_next, skip backends that are not alive)
//!     → backend.rs (Backend::forward to the chosen upstream)
//!     → Return upstream response or ProxyError
//! ```
//!
//! # Design Decisions
//! - Backend list is fixed at construction and read-only afterwards
//! - Cursor is atomic; fairness under concurrent load is approximate
//! - Selection is bounded to one full cycle, never loops forever
//! - Liveness sits behind the `Backend` trait so other strategies can plug in

use thiserror::Error;

pub mod backend;
pub mod round_robin;

pub use backend::{Backend, BackendError, ForwardError, HttpBackend};
pub use round_robin::{Balancer, BalancerError};

/// Everything that can fail while handling one proxied request.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error(transparent)]
    Balancer(#[from] BalancerError),

    #[error(transparent)]
    Forward(#[from] ForwardError),
}
