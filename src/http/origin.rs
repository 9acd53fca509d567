//! Origin, host and client address resolution.
//!
//! Pure functions over request headers. Every guard in the edge chain decides
//! "same-origin" through [`is_same_origin`], so CORS, CSRF and the WebSocket
//! upgrade guard can never disagree about what counts as a match.

use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use axum::http::{header, Extensions, HeaderMap, HeaderName, Request};

/// Reverse-proxy host header.
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
/// Reverse-proxy client chain header.
pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
/// Single client address header set by some proxies.
pub const X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");

/// The host a request was addressed to.
///
/// `X-Forwarded-Host` wins when present, then `Host`, then the URI authority
/// (HTTP/2 requests carry the host there). Empty when none is available.
pub fn resolve_host<B>(req: &Request<B>) -> String {
    if let Some(host) = header_str(req.headers(), &X_FORWARDED_HOST) {
        return host.to_string();
    }
    if let Some(host) = header_str(req.headers(), &header::HOST) {
        return host.to_string();
    }
    req.uri()
        .authority()
        .map(|a| a.as_str().to_string())
        .unwrap_or_default()
}

/// Strip the `<scheme>://` prefix and any trailing slashes from an origin.
///
/// `https://app.example:443/` becomes `app.example:443`. The port is kept as
/// written; no default-port folding happens.
pub fn normalize_origin(origin: &str) -> &str {
    strip_scheme(origin).trim_end_matches('/')
}

/// Host portion of a `Referer` value: scheme removed, cut at the first `/`.
pub fn referer_host(referer: &str) -> &str {
    let rest = strip_scheme(referer);
    match rest.find('/') {
        Some(idx) => &rest[..idx],
        None => rest,
    }
}

/// Whether `origin` names the same host the request was sent to.
pub fn is_same_origin(origin: &str, host: &str) -> bool {
    !host.is_empty() && normalize_origin(origin) == host
}

/// The `Origin` header, if present and valid UTF-8.
pub fn origin_header<B>(req: &Request<B>) -> Option<&str> {
    header_str(req.headers(), &header::ORIGIN)
}

/// Verdict for a request that carries an `Origin` header.
///
/// `None` when the header is absent or empty, otherwise whether it matches
/// the resolved host.
pub fn origin_matches<B>(req: &Request<B>) -> Option<bool> {
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .filter(|v| !v.is_empty())?;
    let host = resolve_host(req);
    // A non-UTF-8 Origin can never match.
    Some(
        origin
            .to_str()
            .map(|o| is_same_origin(o, &host))
            .unwrap_or(false),
    )
}

/// Client address used for token binding.
///
/// The peer address of the connection, unless `trust_forwarded_for` is set,
/// in which case the first `X-Forwarded-For` entry (or `X-Real-IP`) takes
/// precedence.
pub fn client_addr<B>(req: &Request<B>, trust_forwarded_for: bool) -> Option<IpAddr> {
    client_addr_from_parts(req.headers(), req.extensions(), trust_forwarded_for)
}

/// [`client_addr`] for callers holding request parts instead of a request.
pub fn client_addr_from_parts(
    headers: &HeaderMap,
    extensions: &Extensions,
    trust_forwarded_for: bool,
) -> Option<IpAddr> {
    if trust_forwarded_for {
        if let Some(ip) = forwarded_client(headers) {
            return Some(ip);
        }
    }
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

fn forwarded_client(headers: &HeaderMap) -> Option<IpAddr> {
    header_str(headers, &X_FORWARDED_FOR)
        .and_then(|chain| chain.split(',').next())
        .and_then(|first| first.trim().parse().ok())
        .or_else(|| header_str(headers, &X_REAL_IP).and_then(|ip| ip.trim().parse().ok()))
}

fn strip_scheme(value: &str) -> &str {
    match value.find("://") {
        Some(idx) => &value[idx + 3..],
        None => value,
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(headers: &[(&str, &str)]) -> Request<Body> {
        let mut builder = Request::builder().uri("/api/version");
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_normalize_origin() {
        assert_eq!(normalize_origin("http://localhost:8088"), "localhost:8088");
        assert_eq!(normalize_origin("https://app.example:443/"), "app.example:443");
        assert_eq!(normalize_origin("app.example//"), "app.example");
        assert_eq!(normalize_origin("null"), "null");
    }

    #[test]
    fn test_scheme_and_slash_do_not_matter() {
        assert!(is_same_origin("https://app.example:443/", "app.example:443"));
        assert!(is_same_origin("http://app.example:443", "app.example:443"));
        // Ports are compared literally.
        assert!(!is_same_origin("https://app.example", "app.example:443"));
        assert!(!is_same_origin("http://localhost:8088", ""));
    }

    #[test]
    fn test_referer_host() {
        assert_eq!(referer_host("http://localhost:8088/browser?db=1"), "localhost:8088");
        assert_eq!(referer_host("https://app.example"), "app.example");
        assert_eq!(referer_host("localhost:8088/x"), "localhost:8088");
    }

    #[test]
    fn test_resolve_host_prefers_forwarded() {
        let req = request(&[("host", "127.0.0.1:8088"), ("x-forwarded-host", "rdm.example.com")]);
        assert_eq!(resolve_host(&req), "rdm.example.com");

        let req = request(&[("host", "127.0.0.1:8088")]);
        assert_eq!(resolve_host(&req), "127.0.0.1:8088");
    }

    #[test]
    fn test_resolve_host_from_authority() {
        let req = Request::builder()
            .uri("https://rdm.example.com/api/version")
            .body(Body::empty())
            .unwrap();
        assert_eq!(resolve_host(&req), "rdm.example.com");
    }

    #[test]
    fn test_origin_matches() {
        let req = request(&[("host", "localhost:8088")]);
        assert_eq!(origin_matches(&req), None);

        let req = request(&[("host", "localhost:8088"), ("origin", "http://localhost:8088")]);
        assert_eq!(origin_matches(&req), Some(true));

        let req = request(&[("host", "localhost:8088"), ("origin", "http://evil.test")]);
        assert_eq!(origin_matches(&req), Some(false));
        let req = request(&[("host", "localhost:8088"), ("origin", "")]);
        assert_eq!(origin_matches(&req), None);
    }

    #[test]
    fn test_client_addr_from_peer() {
        let mut req = request(&[("x-forwarded-for", "10.0.0.9")]);
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 5], 50000))));

        assert_eq!(client_addr(&req, false), Some(IpAddr::from([192, 168, 1, 5])));
        assert_eq!(client_addr(&req, true), Some(IpAddr::from([10, 0, 0, 9])));
    }

    #[test]
    fn test_client_addr_forwarded_chain_and_real_ip() {
        let req = request(&[("x-forwarded-for", "203.0.113.7, 10.0.0.1")]);
        assert_eq!(client_addr(&req, true), Some(IpAddr::from([203, 0, 113, 7])));

        let req = request(&[("x-real-ip", "203.0.113.8")]);
        assert_eq!(client_addr(&req, true), Some(IpAddr::from([203, 0, 113, 8])));

        let req = request(&[]);
        assert_eq!(client_addr(&req, true), None);
    }
}
