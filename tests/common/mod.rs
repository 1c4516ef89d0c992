//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Router,
};
use round_robin_proxy::{Backend, Balancer, BalancerConfig, HttpBackend, HttpServer};
use tokio::net::{TcpListener, TcpSocket};

/// Start a mock backend that echoes what it received.
///
/// The body is `"<name> <METHOD> <path?query>"`, followed by the request
/// body on a new line when one was sent. The `x-backend` response header
/// carries the name. Path `/teapot` answers 418.
pub async fn start_echo_backend(name: &'static str) -> SocketAddr {
    let app = Router::new().fallback(echo).with_state(name);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}

async fn echo(State(name): State<&'static str>, request: Request) -> impl IntoResponse {
    let method = request.method().clone();
    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_default();
    let headers = request.headers().clone();
    let body: Bytes = axum::body::to_bytes(request.into_body(), usize::MAX)
        .await
        .unwrap_or_default();

    let mut text = format!("{name} {method} {target}");
    if !body.is_empty() {
        text.push('\n');
        text.push_str(&String::from_utf8_lossy(&body));
    }

    let status = if target == "/teapot" {
        StatusCode::IM_A_TEAPOT
    } else {
        StatusCode::OK
    };

    let mut response_headers = HeaderMap::new();
    response_headers.insert("x-backend", name.parse().unwrap());
    for header in ["x-forwarded-for", "x-forwarded-host", "x-custom", "proxy-authorization"] {
        if let Some(value) = headers.get(header) {
            response_headers.insert(
                format!("x-echo-{header}").parse::<axum::http::HeaderName>().unwrap(),
                value.clone(),
            );
        }
    }

    (status, response_headers, text)
}

/// An address that refuses connections.
///
/// The port stays bound without listening for as long as the returned
/// socket is held, so nothing else can take it.
pub fn refusing_addr() -> (TcpSocket, SocketAddr) {
    let socket = TcpSocket::new_v4().unwrap();
    socket.bind("127.0.0.1:0".parse().unwrap()).unwrap();
    let addr = socket.local_addr().unwrap();
    (socket, addr)
}

/// HTTP backends for the given addresses, in order.
pub fn http_backends(addrs: &[SocketAddr]) -> Vec<Arc<HttpBackend>> {
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    addrs
        .iter()
        .map(|addr| Arc::new(HttpBackend::new(&format!("http://{addr}"), client.clone()).unwrap()))
        .collect()
}

/// Start the proxy on an ephemeral port in front of `backends`.
pub async fn start_proxy(backends: &[Arc<HttpBackend>]) -> SocketAddr {
    start_proxy_with_config(backends, &BalancerConfig::default()).await
}

/// Like [`start_proxy`], with the server layers built from `config`.
pub async fn start_proxy_with_config(
    backends: &[Arc<HttpBackend>],
    config: &BalancerConfig,
) -> SocketAddr {
    let backends = backends
        .iter()
        .map(|b| b.clone() as Arc<dyn Backend>)
        .collect();
    let balancer = Arc::new(Balancer::new(0, backends).unwrap());
    let server = HttpServer::new(balancer, config);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = server.run(listener).await;
    });

    addr
}

/// A client that never goes through a system proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
