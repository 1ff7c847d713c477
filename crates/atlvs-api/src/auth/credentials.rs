//! Credential extraction and cookie re-issue

use atlvs_core::constants::ORGANIZATION_HEADER;
use atlvs_core::AppError;
use atlvs_gate::{Credentials, RotatedCredential};
use axum::extract::Query;
use axum::http::{header, HeaderMap, HeaderValue, Uri};
use serde::Deserialize;
use uuid::Uuid;

/// Value of cookie `name`, across every `Cookie` header.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_string())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
}

/// Access token from `Authorization: Bearer`, then the session cookie. The
/// refresh token only travels in its cookie.
pub fn credentials_from_headers(
    headers: &HeaderMap,
    session_cookie: &str,
    refresh_cookie: &str,
) -> Credentials {
    Credentials::new(
        bearer_token(headers).or_else(|| read_cookie(headers, session_cookie)),
        read_cookie(headers, refresh_cookie),
    )
}

#[derive(Debug, Deserialize)]
struct OrganizationQuery {
    org: Option<String>,
}

fn organization_query(uri: &Uri) -> Option<String> {
    Query::<OrganizationQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(query)| query.org)
}

/// Organization explicitly requested through the header or the `org` query
/// parameter. The id is untrusted until the membership lookup confirms it.
pub fn requested_organization(headers: &HeaderMap, uri: &Uri) -> Result<Option<Uuid>, AppError> {
    let raw = headers
        .get(ORGANIZATION_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .or_else(|| organization_query(uri));

    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => Uuid::parse_str(value)
            .map(Some)
            .map_err(|_| AppError::InvalidInput("Organization id must be a UUID".to_string())),
    }
}

fn cookie(name: &str, value: &str, max_age: Option<i64>, secure: bool) -> Option<HeaderValue> {
    let mut cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", name, value);
    if let Some(max_age) = max_age {
        cookie.push_str(&format!("; Max-Age={}", max_age));
    }
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).ok()
}

/// `Set-Cookie` values that hand a rotated credential back to the browser.
pub fn rotated_cookies(
    rotated: &RotatedCredential,
    session_cookie: &str,
    refresh_cookie: &str,
    secure: bool,
) -> Vec<HeaderValue> {
    [
        cookie(session_cookie, &rotated.access_token, rotated.expires_in, secure),
        cookie(refresh_cookie, &rotated.refresh_token, None, secure),
    ]
    .into_iter()
    .flatten()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer header-token"));
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; sb-access-token=cookie-token; sb-refresh-token=r1"),
        );
        let credentials = credentials_from_headers(&headers, "sb-access-token", "sb-refresh-token");
        assert_eq!(credentials.access_token.as_deref(), Some("header-token"));
        assert_eq!(credentials.refresh_token.as_deref(), Some("r1"));
    }

    #[test]
    fn test_cookie_fallback_and_empty_values() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("sb-access-token=; other=1"));
        let credentials = credentials_from_headers(&headers, "sb-access-token", "sb-refresh-token");
        assert!(credentials.is_empty());

        headers.insert(header::COOKIE, HeaderValue::from_static("sb-access-token=abc"));
        let credentials = credentials_from_headers(&headers, "sb-access-token", "sb-refresh-token");
        assert_eq!(credentials.access_token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_requested_organization_sources() {
        let org = Uuid::new_v4();
        let uri: Uri = format!("/api/v1/projects?org={}", org).parse().unwrap();
        assert_eq!(requested_organization(&HeaderMap::new(), &uri).unwrap(), Some(org));

        let mut headers = HeaderMap::new();
        let other = Uuid::new_v4();
        headers.insert(ORGANIZATION_HEADER, HeaderValue::from_str(&other.to_string()).unwrap());
        assert_eq!(requested_organization(&headers, &uri).unwrap(), Some(other));

        let plain: Uri = "/api/v1/projects".parse().unwrap();
        assert_eq!(requested_organization(&HeaderMap::new(), &plain).unwrap(), None);

        let encoded: Uri = format!("/dashboard?tab=mine&org=%20{}%20", org).parse().unwrap();
        assert_eq!(requested_organization(&HeaderMap::new(), &encoded).unwrap(), Some(org));

        let bad: Uri = "/api/v1/projects?org=acme".parse().unwrap();
        assert!(matches!(
            requested_organization(&HeaderMap::new(), &bad),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_rotated_cookies() {
        let rotated = RotatedCredential {
            access_token: "new-access".to_string(),
            refresh_token: "new-refresh".to_string(),
            expires_in: Some(3600),
        };
        let cookies = rotated_cookies(&rotated, "sb-access-token", "sb-refresh-token", true);
        assert_eq!(cookies.len(), 2);
        assert_eq!(
            cookies[0],
            "sb-access-token=new-access; Path=/; HttpOnly; SameSite=Lax; Max-Age=3600; Secure"
        );
        assert!(cookies[1].to_str().unwrap().starts_with("sb-refresh-token=new-refresh;"));
    }
}
