//! Client IP extraction for rate limiting.

use axum::http::{Extensions, HeaderMap};

/// Extract the client IP address from a request.
///
/// Checks `X-Forwarded-For` first (reverse proxy), then falls back to the
/// socket address recorded by `into_make_service_with_connect_info`.
pub fn extract_client_ip(headers: &HeaderMap, extensions: &Extensions) -> Option<String> {
    use axum::extract::ConnectInfo;
    use std::net::SocketAddr;

    if let Some(forwarded_for) = headers.get("x-forwarded-for") {
        if let Ok(value) = forwarded_for.to_str() {
            if let Some(first_ip) = value.split(',').next() {
                let ip = first_ip.trim();
                if !ip.is_empty() {
                    return Some(ip.to_string());
                }
            }
        }
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_forwarded_for_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );

        let ip = extract_client_ip(&headers, &Extensions::new());
        assert_eq!(ip.as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn test_no_source_yields_none() {
        let headers = HeaderMap::new();
        assert_eq!(extract_client_ip(&headers, &Extensions::new()), None);
    }
}
