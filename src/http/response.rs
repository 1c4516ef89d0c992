//! Response handling and transformation.
//!
//! # Responsibilities
//! - Relay the upstream response (status, headers, body) to the client
//! - Strip hop-by-hop headers
//! - Map proxy errors to appropriate HTTP status codes
//!
//! # Design Decisions
//! - Upstream bodies are streamed, never buffered
//! - Exhausted backend pool results in 503 Service Unavailable
//! - A streamed body that outgrows the configured limit results in 413
//! - Upstream timeouts result in 504 Gateway Timeout
//! - Other transport failures result in 502 Bad Gateway

use axum::body::Body;
use axum::http::{Response, StatusCode};
use axum::response::IntoResponse;

use crate::http::request::strip_hop_by_hop;
use crate::load_balancer::{BalancerError, ForwardError, ProxyError};

/// Convert an upstream response into one for the client.
pub fn from_upstream(upstream: reqwest::Response) -> Response<Body> {
    let status = upstream.status();
    let headers = strip_hop_by_hop(upstream.headers());

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

impl ProxyError {
    /// Status code reported to the client for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::Balancer(BalancerError::NoBackendAvailable { .. }) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ProxyError::Balancer(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::Forward(ForwardError::BodyTooLarge) => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::Forward(ForwardError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Forward(ForwardError::Transport { .. }) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_mapping() {
        let unavailable = ProxyError::from(BalancerError::NoBackendAvailable { checked: 2 });
        assert_eq!(unavailable.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let timeout = ProxyError::from(ForwardError::Timeout {
            address: "http://127.0.0.1:3000".into(),
            timeout: Duration::from_secs(1),
        });
        assert_eq!(timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);

        let too_large = ProxyError::from(ForwardError::BodyTooLarge);
        assert_eq!(too_large.status_code(), StatusCode::PAYLOAD_TOO_LARGE);

        let empty = ProxyError::from(BalancerError::Empty);
        assert_eq!(empty.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_error_response_body() {
        let response =
            ProxyError::from(BalancerError::NoBackendAvailable { checked: 3 }).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"no backend available after checking 3 backends");
    }
}
