//! Approximate request size.

use axum::http::{header, Request, Version};

/// Host the request was addressed to: the `Host` header, or the URI
/// authority (HTTP/2 `:authority`). Empty when neither is present.
pub fn request_host<B>(req: &Request<B>) -> &str {
    req.headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| req.uri().authority().map(|a| a.as_str()))
        .unwrap_or("")
}

pub fn proto_str(v: Version) -> &'static str {
    match v {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "",
    }
}

/// Declared body length; `None` when absent or unparseable.
pub fn content_length<B>(req: &Request<B>) -> Option<u64> {
    req.headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

/// Estimate the size of a request in bytes.
///
/// Sums the request target, method, protocol, header names and values, host,
/// and the declared content length. Framing is not counted. The `Host`
/// header is skipped in the header sum because the host is counted on its
/// own. The sum saturates at `u64::MAX`; a client-declared length can be
/// arbitrarily large.
pub fn estimate_request_size<B>(req: &Request<B>) -> u64 {
    let len = |n: usize| n as u64;
    let mut s = len(req.uri().to_string().len());
    s = s.saturating_add(len(req.method().as_str().len()));
    s = s.saturating_add(len(proto_str(req.version()).len()));
    for (name, value) in req.headers() {
        if name == header::HOST {
            continue;
        }
        s = s.saturating_add(len(name.as_str().len()));
        s = s.saturating_add(len(value.as_bytes().len()));
    }
    s = s.saturating_add(len(request_host(req).len()));

    s.saturating_add(content_length(req).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(builder: axum::http::request::Builder) -> Request<()> {
        builder.body(()).unwrap()
    }

    #[test]
    fn minimal_get() {
        let r = req(Request::builder().method("GET").uri("/x").header("host", "h"));
        // "/x" + "GET" + "HTTP/1.1" + "h"
        assert_eq!(estimate_request_size(&r), 2 + 3 + 8 + 1);
    }

    #[test]
    fn headers_and_content_length_count() {
        let r = req(
            Request::builder()
                .method("POST")
                .uri("/up?a=1")
                .header("host", "example.com")
                .header("x-k", "vv")
                .header("content-length", "100"),
        );
        let expected = "/up?a=1".len()
            + "POST".len()
            + "HTTP/1.1".len()
            + "x-k".len()
            + "vv".len()
            + "content-length".len()
            + "100".len()
            + "example.com".len()
            + 100;
        assert_eq!(estimate_request_size(&r), expected as u64);
    }

    #[test]
    fn unknown_length_contributes_nothing() {
        let r = req(
            Request::builder()
                .uri("/")
                .header("content-length", "nope"),
        );
        assert_eq!(content_length(&r), None);
        let expected = 1 + 3 + 8 + "content-length".len() + "nope".len();
        assert_eq!(estimate_request_size(&r), expected as u64);
    }

    #[test]
    fn huge_content_length_saturates() {
        let r = req(
            Request::builder()
                .method("POST")
                .uri("/up")
                .header("host", "h")
                .header("content-length", "18446744073709551613"),
        );
        assert_eq!(content_length(&r), Some(u64::MAX - 2));
        assert_eq!(estimate_request_size(&r), u64::MAX);
    }

    #[test]
    fn host_falls_back_to_authority() {
        let r = req(
            Request::builder()
                .uri("http://a.test:8080/p")
                .version(Version::HTTP_2),
        );
        assert_eq!(request_host(&r), "a.test:8080");
        assert_eq!(proto_str(r.version()), "HTTP/2.0");
    }

    #[test]
    fn no_host_at_all() {
        let r = req(Request::builder().uri("/"));
        assert_eq!(request_host(&r), "");
    }
}
