//! Request key extractors.

use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, Request};
use axum::http::header::HeaderName;
use axum::http::HeaderMap;

use crate::policy::KeyExtractor;

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

/// Keys requests by client IP address.
///
/// By default only the peer address recorded by `ConnectInfo<SocketAddr>` is
/// used, since forwarding headers are set by the client. Behind a trusted
/// reverse proxy, [`ClientIp::behind_proxy`] reads the first entry of
/// `X-Forwarded-For`, then `X-Real-Ip`, and falls back to the peer when
/// neither holds a valid IP address. Requests without any address get the
/// empty key.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientIp {
    trust_forwarded: bool,
}

impl ClientIp {
    /// Key by the connection's peer address only.
    pub fn peer() -> Self {
        Self::default()
    }

    /// Key by the address reported in forwarding headers.
    ///
    /// Only use this when every request passes through a proxy that
    /// overwrites these headers.
    pub fn behind_proxy() -> Self {
        Self {
            trust_forwarded: true,
        }
    }

    /// Whether forwarding headers are consulted.
    pub fn trusts_forwarded(&self) -> bool {
        self.trust_forwarded
    }

    /// Client IP of `req`.
    pub fn resolve(&self, req: &Request) -> Option<IpAddr> {
        if self.trust_forwarded {
            if let Some(ip) = forwarded_ip(req.headers()) {
                return Some(ip);
            }
        }

        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
    }
}

impl KeyExtractor<Request> for ClientIp {
    fn extract(&self, req: &Request) -> String {
        self.resolve(req)
            .map(|ip| ip.to_string())
            .unwrap_or_default()
    }
}

fn header_ip(headers: &HeaderMap, name: &str) -> Option<IpAddr> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse().ok())
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    header_ip(headers, X_FORWARDED_FOR).or_else(|| header_ip(headers, X_REAL_IP))
}

/// Keys requests by the value of one header, e.g. an account identifier.
///
/// Absent or non-UTF-8 values produce the empty key.
#[derive(Debug, Clone)]
pub struct Header {
    name: HeaderName,
}

impl Header {
    /// Extract keys from the header called `name`.
    pub fn new(name: HeaderName) -> Self {
        Self { name }
    }

    /// Extract keys from a header given by a static name.
    pub fn from_static(name: &'static str) -> Self {
        Self::new(HeaderName::from_static(name))
    }
}

impl KeyExtractor<Request> for Header {
    fn extract(&self, req: &Request) -> String {
        req.headers()
            .get(&self.name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    }
}

/// Keys every request with the same identifier, known when the route is
/// built.
#[derive(Debug, Clone)]
pub struct Fixed(String);

impl Fixed {
    /// Key every request with `value`.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl KeyExtractor<Request> for Fixed {
    fn extract(&self, _req: &Request) -> String {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request() -> axum::http::request::Builder {
        axum::http::Request::builder().uri("/ping")
    }

    fn with_peer(mut req: Request, addr: &str) -> Request {
        let addr: SocketAddr = addr.parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        req
    }

    #[test]
    fn test_client_ip_from_connect_info() {
        let req = with_peer(request().body(Body::empty()).unwrap(), "127.0.0.1:12345");
        assert_eq!(ClientIp::peer().extract(&req), "127.0.0.1");
    }

    #[test]
    fn test_client_ip_ignores_forwarding_headers_by_default() {
        let req = request()
            .header("X-Forwarded-For", "203.0.113.7")
            .header("X-Real-Ip", "198.51.100.2")
            .body(Body::empty())
            .unwrap();
        let req = with_peer(req, "127.0.0.1:12345");

        assert!(!ClientIp::default().trusts_forwarded());
        assert_eq!(ClientIp::default().extract(&req), "127.0.0.1");
    }

    #[test]
    fn test_behind_proxy_prefers_forwarded_for() {
        let req = request()
            .header("X-Forwarded-For", " 203.0.113.7 , 10.0.0.1")
            .header("X-Real-Ip", "198.51.100.2")
            .body(Body::empty())
            .unwrap();
        let req = with_peer(req, "127.0.0.1:12345");

        assert_eq!(ClientIp::behind_proxy().extract(&req), "203.0.113.7");
    }

    #[test]
    fn test_behind_proxy_falls_back_to_real_ip() {
        let req = request()
            .header("X-Forwarded-For", "")
            .header("X-Real-Ip", "198.51.100.2")
            .body(Body::empty())
            .unwrap();

        assert_eq!(ClientIp::behind_proxy().extract(&req), "198.51.100.2");
    }

    #[test]
    fn test_behind_proxy_rejects_garbage_addresses() {
        for value in ["not-an-ip-1", "not-an-ip-2", "203.0.113.7:80", "unknown"] {
            let req = request()
                .header("X-Forwarded-For", value)
                .header("X-Real-Ip", "also-garbage")
                .body(Body::empty())
                .unwrap();
            let req = with_peer(req, "127.0.0.1:12345");

            assert_eq!(ClientIp::behind_proxy().extract(&req), "127.0.0.1");
        }
    }

    #[test]
    fn test_client_ip_missing_is_empty_key() {
        let req = request()
            .header("X-Forwarded-For", "garbage")
            .body(Body::empty())
            .unwrap();

        assert_eq!(ClientIp::peer().resolve(&req), None);
        assert_eq!(ClientIp::peer().extract(&req), "");
        assert_eq!(ClientIp::behind_proxy().extract(&req), "");
    }

    #[test]
    fn test_ipv6_peer_drops_port() {
        let req = with_peer(request().body(Body::empty()).unwrap(), "[::1]:8080");
        assert_eq!(ClientIp::peer().extract(&req), "::1");
    }

    #[test]
    fn test_header_extractor() {
        let extractor = Header::from_static("x-account-id");

        let req = request()
            .header("X-Account-Id", " john@doe.com ")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extractor.extract(&req), "john@doe.com");

        let req = request().body(Body::empty()).unwrap();
        assert_eq!(extractor.extract(&req), "");
    }

    #[test]
    fn test_fixed_extractor() {
        let req = request().body(Body::empty()).unwrap();
        assert_eq!(Fixed::new("testUser").extract(&req), "testUser");
    }
}
