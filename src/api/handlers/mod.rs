pub mod auth_gate;
pub mod callback;
pub mod login;

pub use self::auth_gate::auth_gate;
pub use self::callback::callback;
pub use self::login::login;

// common helpers for the handlers
use crate::api::error::GatewayError;
use anyhow::anyhow;
use axum::{
    http::{header::COOKIE, header::LOCATION, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

/// Find the first cookie named `name`. Duplicate cookies of the same name
/// are never aggregated; the first match wins.
pub(crate) fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
                continue;
            };
            if key.trim() == name {
                return Some(val.trim().to_string());
            }
        }
    }
    None
}

/// 307 with a `Location` header and no body.
pub(crate) fn temporary_redirect(location: &str) -> Result<Response, GatewayError> {
    let value = HeaderValue::from_str(location)
        .map_err(|err| GatewayError::Internal(anyhow!("Invalid redirect location: {err}")))?;

    let mut headers = HeaderMap::new();
    headers.insert(LOCATION, value);
    Ok((StatusCode::TEMPORARY_REDIRECT, headers).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extract_cookie_finds_the_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("other=1; letmein=123.alice.sig; trailing=x"),
        );
        assert_eq!(
            extract_cookie(&headers, "letmein"),
            Some("123.alice.sig".to_string())
        );
    }

    #[test]
    fn extract_cookie_first_match_wins() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("letmein=first"));
        headers.append(COOKIE, HeaderValue::from_static("letmein=second"));
        assert_eq!(extract_cookie(&headers, "letmein"), Some("first".to_string()));
    }

    #[test]
    fn extract_cookie_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("other=1"));
        assert_eq!(extract_cookie(&headers, "letmein"), None);
        assert_eq!(extract_cookie(&HeaderMap::new(), "letmein"), None);
    }

    #[test]
    fn extract_cookie_skips_malformed_pairs() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("junk; letmein=ok"));
        assert_eq!(extract_cookie(&headers, "letmein"), Some("ok".to_string()));
    }

    #[test]
    fn temporary_redirect_sets_location() {
        let response = temporary_redirect("https://app.example.com").unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers().get(LOCATION).unwrap(),
            "https://app.example.com"
        );
    }
}
