//! Request transformation for forwarding.
//!
//! # Responsibilities
//! - Build the upstream URL from the backend base URL and the inbound URI
//! - Strip hop-by-hop headers before forwarding
//! - Add reverse-proxy headers (X-Forwarded-For, X-Forwarded-Host)
//!
//! # Design Decisions
//! - Path and query are carried over verbatim (no re-encoding)
//! - Host is not forwarded; the upstream sees its own host name
//! - Content-Length is kept so a streamed body keeps its original framing
//! - `TE: trailers` survives the hop-by-hop strip; other TE values do not
//! - Upgrade is dropped, so WebSocket and other 101 handshakes are not relayed

use std::net::SocketAddr;

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Uri};
use url::Url;

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

/// Headers that only apply to a single connection.
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "proxy-connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Join the backend base URL with the inbound path and query.
///
/// Paths are joined with exactly one slash. When both sides carry a query
/// they are concatenated with `&`.
pub fn upstream_url(base: &Url, incoming: &Uri) -> Url {
    let mut url = base.clone();
    url.set_path(&join_paths(base.path(), incoming.path()));

    let base_query = base.query().filter(|q| !q.is_empty());
    let incoming_query = incoming.query().filter(|q| !q.is_empty());
    let query = match (base_query, incoming_query) {
        (Some(b), Some(q)) => Some(format!("{b}&{q}")),
        (Some(b), None) => Some(b.to_string()),
        (None, Some(q)) => Some(q.to_string()),
        (None, None) => None,
    };
    url.set_query(query.as_deref());
    url
}

fn join_paths(a: &str, b: &str) -> String {
    match (a.ends_with('/'), b.starts_with('/')) {
        (true, true) => format!("{a}{}", &b[1..]),
        (false, false) => format!("{a}/{b}"),
        _ => format!("{a}{b}"),
    }
}

/// Returns true for headers that must not cross the proxy.
fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

/// Copy `headers`, dropping hop-by-hop headers and any header named in
/// `Connection`.
pub fn strip_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    let listed: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
        .collect();

    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if is_hop_by_hop(name) || listed.iter().any(|token| token == name.as_str()) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

/// Whether the client sent a `TE` header naming `trailers`.
fn accepts_trailers(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::TE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|token| {
            token
                .split(';')
                .next()
                .is_some_and(|name| name.trim().eq_ignore_ascii_case("trailers"))
        })
}

/// Headers to send upstream for an inbound request.
pub fn upstream_headers(incoming: &HeaderMap, client_addr: Option<SocketAddr>) -> HeaderMap {
    let mut headers = strip_hop_by_hop(incoming);

    if accepts_trailers(incoming) {
        headers.insert(header::TE, HeaderValue::from_static("trailers"));
    }

    if let Some(host) = headers.remove(header::HOST) {
        if !headers.contains_key(X_FORWARDED_HOST) {
            headers.insert(X_FORWARDED_HOST, host);
        }
    }

    if let Some(addr) = client_addr {
        let prior: Vec<&str> = incoming
            .get_all(X_FORWARDED_FOR)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        let ip = addr.ip().to_string();
        let chain = if prior.is_empty() {
            ip
        } else {
            format!("{}, {}", prior.join(", "), ip)
        };
        if let Ok(value) = HeaderValue::from_str(&chain) {
            headers.insert(X_FORWARDED_FOR, value);
        }
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(base: &str, uri: &str) -> String {
        let base = Url::parse(base).unwrap();
        let uri: Uri = uri.parse().unwrap();
        upstream_url(&base, &uri).to_string()
    }

    #[test]
    fn test_path_and_query_preserved() {
        assert_eq!(
            url("http://127.0.0.1:3000", "/foo/bar?x=1"),
            "http://127.0.0.1:3000/foo/bar?x=1"
        );
        assert_eq!(url("http://127.0.0.1:3000", "/"), "http://127.0.0.1:3000/");
    }

    #[test]
    fn test_base_path_joined_with_single_slash() {
        assert_eq!(url("http://h/api/", "/v1/items"), "http://h/api/v1/items");
        assert_eq!(url("http://h/api", "/v1/items"), "http://h/api/v1/items");
    }

    #[test]
    fn test_queries_merged() {
        assert_eq!(url("http://h/?key=abc", "/search?q=rust"), "http://h/search?key=abc&q=rust");
        assert_eq!(url("http://h/?key=abc", "/search"), "http://h/search?key=abc");
    }

    #[test]
    fn test_encoded_path_not_reencoded() {
        assert_eq!(url("http://h", "/a%20b?q=%2F"), "http://h/a%20b?q=%2F");
    }

    #[test]
    fn test_hop_by_hop_stripped() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, x-session"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-session", HeaderValue::from_static("abc"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("text/plain"));

        let out = strip_hop_by_hop(&headers);
        assert_eq!(out.len(), 1);
        assert_eq!(out.get(header::ACCEPT).unwrap(), "text/plain");
    }

    #[test]
    fn test_forwarded_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("lb.example.com"));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("3"));
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static("10.0.0.1"));

        let client: SocketAddr = "192.168.1.7:55000".parse().unwrap();
        let out = upstream_headers(&headers, Some(client));

        assert!(out.get(header::HOST).is_none());
        assert_eq!(out.get(header::CONTENT_LENGTH).unwrap(), "3");
        assert_eq!(out.get(X_FORWARDED_HOST).unwrap(), "lb.example.com");
        assert_eq!(out.get(X_FORWARDED_FOR).unwrap(), "10.0.0.1, 192.168.1.7");
    }

    #[test]
    fn test_te_trailers_kept() {
        let mut headers = HeaderMap::new();
        headers.insert(header::TE, HeaderValue::from_static("gzip, trailers"));
        headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));

        let out = upstream_headers(&headers, None);
        assert_eq!(out.get(header::TE).unwrap(), "trailers");
        assert!(out.get(header::UPGRADE).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(header::TE, HeaderValue::from_static("gzip"));
        assert!(upstream_headers(&headers, None).get(header::TE).is_none());
    }

    #[test]
    fn test_no_client_addr_keeps_existing_chain() {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static("10.0.0.1"));

        let out = upstream_headers(&headers, None);
        assert_eq!(out.get(X_FORWARDED_FOR).unwrap(), "10.0.0.1");
    }
}
