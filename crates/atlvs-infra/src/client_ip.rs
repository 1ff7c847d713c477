//! Client IP extraction
//!
//! `X-Forwarded-For` is only honoured up to the number of trusted proxies in
//! front of the service; anything further left can be forged by the client.

use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

/// Best-effort client address, `None` when nothing trustworthy is available.
pub fn extract_client_ip(
    headers: &HeaderMap,
    socket_addr: Option<&SocketAddr>,
    trusted_proxy_count: usize,
) -> Option<IpAddr> {
    if trusted_proxy_count > 0 {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| from_forwarded_for(v, trusted_proxy_count));
        if forwarded.is_some() {
            return forwarded;
        }

        let real_ip = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<IpAddr>().ok());
        if real_ip.is_some() {
            return real_ip;
        }
    }

    socket_addr.map(|addr| addr.ip())
}

/// The hop just before the trusted proxies, i.e. the `trusted`-th entry from
/// the right.
fn from_forwarded_for(value: &str, trusted: usize) -> Option<IpAddr> {
    let hops: Vec<&str> = value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    let index = hops.len().checked_sub(trusted)?;
    hops.get(index)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(xff: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert("x-forwarded-for", HeaderValue::from_str(xff).unwrap());
        h
    }

    #[test]
    fn test_forwarded_for_respects_trusted_hops() {
        let h = headers("203.0.113.9, 198.51.100.7, 10.0.0.2");
        assert_eq!(
            extract_client_ip(&h, None, 1),
            Some("10.0.0.2".parse().unwrap())
        );
        assert_eq!(
            extract_client_ip(&h, None, 2),
            Some("198.51.100.7".parse().unwrap())
        );
        assert_eq!(
            extract_client_ip(&h, None, 3),
            Some("203.0.113.9".parse().unwrap())
        );
    }

    #[test]
    fn test_untrusted_headers_fall_back_to_socket() {
        let h = headers("203.0.113.9");
        let socket: SocketAddr = "192.0.2.1:443".parse().unwrap();
        assert_eq!(
            extract_client_ip(&h, Some(&socket), 0),
            Some(socket.ip())
        );
        assert_eq!(extract_client_ip(&h, None, 0), None);
    }

    #[test]
    fn test_short_or_garbage_chain_is_ignored() {
        let socket: SocketAddr = "192.0.2.1:443".parse().unwrap();
        assert_eq!(
            extract_client_ip(&headers("not-an-ip"), Some(&socket), 1),
            Some(socket.ip())
        );
        assert_eq!(
            extract_client_ip(&headers("203.0.113.9"), Some(&socket), 2),
            Some(socket.ip())
        );
    }
}
