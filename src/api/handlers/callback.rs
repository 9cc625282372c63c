//! OAuth callback: exchange the code, confirm the identity, mint the
//! session cookie.

use crate::api::{error::GatewayError, handlers::temporary_redirect, state::GatewayState};
use anyhow::anyhow;
use axum::{
    extract::{Extension, Query},
    http::{header::SET_COOKIE, HeaderValue},
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: String,
    #[serde(default)]
    state: String,
}

/// `GET /callback`: the rest of the login state machine.
///
/// Every failure except an allow-list miss surfaces as the 500 JSON
/// envelope; the allow-list miss is a bare 403 with no cookie and no side
/// effects.
pub async fn callback(
    Extension(gateway): Extension<Arc<GatewayState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Response, GatewayError> {
    let origin = parse_state_origin(&params.state)?;

    let token = gateway.provider().exchange_code(&params.code).await?;
    let info = gateway
        .provider()
        .fetch_userinfo(&token.access_token)
        .await?;

    if !gateway.logins().contains(&info.login) {
        return Err(GatewayError::NotAuthorized);
    }

    let session = gateway
        .strategy()
        .issue(&info.login)
        .await
        .map_err(GatewayError::Internal)?;
    let cookie = session_cookie(&gateway, &session)?;

    let mut response = temporary_redirect(&origin)?;
    response.headers_mut().insert(SET_COOKIE, cookie);

    info!("Authorized login for {}", info.login);

    // The response above already carries the cookie; delivery failures on
    // this detached task are log-only.
    if let Some(notifier) = gateway.notifier() {
        let notifier = notifier.clone();
        let login = info.login.clone();
        tokio::spawn(async move {
            if let Err(err) = notifier.send_login_event(&login).await {
                warn!("Unable to deliver login notification: {err}");
            }
        });
    }

    Ok(response)
}

/// Recover the `origin` round-tripped through the provider inside `state`.
fn parse_state_origin(state: &str) -> Result<String, GatewayError> {
    let origin = url::form_urlencoded::parse(state.as_bytes())
        .find_map(|(key, value)| (key == "origin").then(|| value.into_owned()));

    match origin {
        Some(origin) if !origin.is_empty() => Ok(origin),
        _ => Err(GatewayError::MalformedState(state.to_string())),
    }
}

fn session_cookie(
    gateway: &GatewayState,
    token: &str,
) -> Result<HeaderValue, GatewayError> {
    let mut cookie = format!(
        "{}={}; Max-Age={}; Path=/; Secure; HttpOnly",
        gateway.cookie_key(),
        token,
        gateway.cookie_max_age(),
    );
    if !gateway.cookie_domain().is_empty() {
        cookie.push_str("; Domain=");
        cookie.push_str(gateway.cookie_domain());
    }

    HeaderValue::from_str(&cookie)
        .map_err(|err| GatewayError::Internal(anyhow!("Invalid session cookie: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_state_origin_recovers_the_origin() {
        assert_eq!(
            parse_state_origin("origin=https%3A%2F%2Fapp.example.com").unwrap(),
            "https://app.example.com"
        );
    }

    #[test]
    fn parse_state_origin_ignores_other_keys() {
        assert_eq!(
            parse_state_origin("foo=bar&origin=https%3A%2F%2Fapp.example.com").unwrap(),
            "https://app.example.com"
        );
    }

    #[test]
    fn parse_state_origin_rejects_missing_or_empty_origin() {
        assert!(parse_state_origin("").is_err());
        assert!(parse_state_origin("foo=bar").is_err());
        assert!(parse_state_origin("origin=").is_err());
    }
}
