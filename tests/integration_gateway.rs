//! Integration tests for the pordisto gateway.
//!
//! The suite serves the real router in-process on an ephemeral listener,
//! stands up a second in-process router playing the OAuth provider's token
//! and userinfo endpoints, and drives the login and verification flows with
//! a redirect-disabled reqwest client.

use anyhow::{Context, Result};
use axum::{
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use pordisto::{
    api,
    api::GatewayState,
    config::{Config, StrategyKind},
};
use reqwest::{
    header::{COOKIE, LOCATION, SET_COOKIE},
    redirect, StatusCode,
};
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;

async fn serve(app: Router) -> Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .context("failed to bind test listener")?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app.into_make_service()).await;
    });
    Ok(addr)
}

/// Provider double: hands out a token to Basic-authenticated clients and
/// reports `login` for the matching bearer.
fn provider_router(login: &'static str) -> Router {
    Router::new()
        .route(
            "/token",
            post(|headers: HeaderMap| async move {
                let authenticated = headers
                    .get("authorization")
                    .and_then(|value| value.to_str().ok())
                    .is_some_and(|value| value.starts_with("Basic "));
                if !authenticated {
                    return Json(json!({"error": "invalid_client"}));
                }
                Json(json!({
                    "token_type": "bearer",
                    "access_token": "test-access-token",
                    "expires_in": 3600,
                    "refresh_token": "",
                    "scope": "login:info"
                }))
            }),
        )
        .route(
            "/info",
            get(move |headers: HeaderMap| async move {
                let authenticated = headers
                    .get("authorization")
                    .and_then(|value| value.to_str().ok())
                    .is_some_and(|value| value == "OAuth test-access-token");
                if !authenticated {
                    return Json(json!({}));
                }
                Json(json!({
                    "login": login,
                    "id": "1",
                    "client_id": "gateway",
                    "psuid": ""
                }))
            }),
        )
}

/// Provider double that rejects every exchange with an OAuth error body.
fn rejecting_provider_router() -> Router {
    Router::new().route(
        "/token",
        post(|| async {
            Json(json!({
                "error": "invalid_grant",
                "error_description": "code expired"
            }))
        }),
    )
}

/// Provider double that answers the token exchange with plain text.
fn non_json_provider_router() -> Router {
    Router::new().route("/token", post(|| async { "upstream exploded" }))
}

fn gateway_config(provider: SocketAddr, default_origin: &str) -> Config {
    let mut config = Config::default();
    config.client_id = "gateway".to_string();
    config.client_secret = "s3cret".to_string();
    config.authorize_url = format!("http://{provider}/authorize");
    config.token_url = format!("http://{provider}/token");
    config.userinfo_url = format!("http://{provider}/info");
    config.redirect_url = "https://auth.example.com/callback".to_string();
    config.default_redirect_url = default_origin.to_string();
    config.logins = vec!["alice".to_string()];
    config.cookie_key = "pordisto_session".to_string();
    config.cookie_secret = "super-secret".to_string();
    config.cookie_salt = "pepper".to_string();
    config.cookie_max_age = 3600;
    config.cookie_domain = "example.com".to_string();
    config.session_strategy = StrategyKind::Stateless;
    config
}

async fn serve_gateway(config: &Config) -> Result<SocketAddr> {
    // The stateless strategy never touches the session store file.
    let storage = std::env::temp_dir().join("pordisto-it-unused-storage.json");
    let gateway = Arc::new(GatewayState::from_config(config, &storage)?);
    serve(api::app(gateway)).await
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(redirect::Policy::none())
        .build()
        .expect("reqwest client")
}

#[tokio::test]
async fn login_without_origin_and_without_default_is_forbidden() -> Result<()> {
    let provider = serve(provider_router("alice")).await?;
    let gateway = serve_gateway(&gateway_config(provider, "")).await?;

    let response = client().get(format!("http://{gateway}/")).send().await?;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(response.headers().get(LOCATION).is_none());
    Ok(())
}

#[tokio::test]
async fn login_redirects_to_the_provider_with_a_double_encoded_state() -> Result<()> {
    let provider = serve(provider_router("alice")).await?;
    let gateway = serve_gateway(&gateway_config(provider, "")).await?;

    let response = client()
        .get(format!("http://{gateway}/"))
        .query(&[("origin", "https://app.example.com")])
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response
        .headers()
        .get(LOCATION)
        .context("missing Location")?
        .to_str()?;
    assert!(location.starts_with(&format!("http://{provider}/authorize?")));
    assert!(location.contains("response_type=code"));
    assert!(location.contains("client_id=gateway"));
    assert!(location.contains("state=origin%3Dhttps%253A%252F%252Fapp.example.com"));
    Ok(())
}

#[tokio::test]
async fn login_falls_back_to_the_configured_default_origin() -> Result<()> {
    let provider = serve(provider_router("alice")).await?;
    let gateway = serve_gateway(&gateway_config(provider, "https://fallback.example.com")).await?;

    let response = client().get(format!("http://{gateway}/")).send().await?;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response.headers()[LOCATION].to_str()?;
    assert!(location.contains("state=origin%3Dhttps%253A%252F%252Ffallback.example.com"));
    Ok(())
}

#[tokio::test]
async fn callback_mints_a_cookie_that_authenticates_the_auth_probe() -> Result<()> {
    let provider = serve(provider_router("alice")).await?;
    let gateway = serve_gateway(&gateway_config(provider, "")).await?;
    let client = client();

    let response = client
        .get(format!("http://{gateway}/callback"))
        .query(&[("code", "X"), ("state", "origin=https://app.example.com")])
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers()[LOCATION].to_str()?,
        "https://app.example.com"
    );

    let cookie = response
        .headers()
        .get(SET_COOKIE)
        .context("missing Set-Cookie")?
        .to_str()?
        .to_string();
    assert!(cookie.starts_with("pordisto_session="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Secure"));
    assert!(cookie.contains("Path=/"));
    assert!(cookie.contains("Max-Age=3600"));
    assert!(cookie.contains("Domain=example.com"));

    let pair = cookie.split(';').next().context("empty cookie")?;
    let probe = client
        .get(format!("http://{gateway}/auth"))
        .header(COOKIE, pair)
        .send()
        .await?;
    assert_eq!(probe.status(), StatusCode::OK);

    // Second probe rides the verification cache.
    let cached = client
        .get(format!("http://{gateway}/auth"))
        .header(COOKIE, pair)
        .send()
        .await?;
    assert_eq!(cached.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn callback_rejects_a_login_missing_from_the_allow_list() -> Result<()> {
    let provider = serve(provider_router("mallory")).await?;
    let gateway = serve_gateway(&gateway_config(provider, "")).await?;

    let response = client()
        .get(format!("http://{gateway}/callback"))
        .query(&[("code", "X"), ("state", "origin=https://app.example.com")])
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(response.headers().get(SET_COOKIE).is_none());
    Ok(())
}

#[tokio::test]
async fn callback_with_malformed_state_is_a_json_error_envelope() -> Result<()> {
    let provider = serve(provider_router("alice")).await?;
    let gateway = serve_gateway(&gateway_config(provider, "")).await?;

    let response = client()
        .get(format!("http://{gateway}/callback"))
        .query(&[("code", "X"), ("state", "no-origin-here")])
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json().await?;
    assert!(body["error"].as_str().is_some());
    Ok(())
}

#[tokio::test]
async fn provider_rejection_surfaces_verbatim() -> Result<()> {
    let provider = serve(rejecting_provider_router()).await?;
    let gateway = serve_gateway(&gateway_config(provider, "")).await?;

    let response = client()
        .get(format!("http://{gateway}/callback"))
        .query(&[("code", "X"), ("state", "origin=https://app.example.com")])
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"], "code expired");
    Ok(())
}

#[tokio::test]
async fn non_json_provider_response_surfaces_its_body() -> Result<()> {
    let provider = serve(non_json_provider_router()).await?;
    let gateway = serve_gateway(&gateway_config(provider, "")).await?;

    let response = client()
        .get(format!("http://{gateway}/callback"))
        .query(&[("code", "X"), ("state", "origin=https://app.example.com")])
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"], "upstream exploded");
    Ok(())
}

#[tokio::test]
async fn tampered_cookie_signature_is_unauthorized() -> Result<()> {
    let provider = serve(provider_router("alice")).await?;
    let gateway = serve_gateway(&gateway_config(provider, "")).await?;
    let client = client();

    let response = client
        .get(format!("http://{gateway}/callback"))
        .query(&[("code", "X"), ("state", "origin=https://app.example.com")])
        .send()
        .await?;
    let cookie = response.headers()[SET_COOKIE].to_str()?.to_string();
    let pair = cookie.split(';').next().context("empty cookie")?;

    // Flip the final character of the signature field.
    let mut tampered = pair.to_string();
    let last = tampered.pop().context("empty pair")?;
    tampered.push(if last == 'A' { 'B' } else { 'A' });

    let probe = client
        .get(format!("http://{gateway}/auth"))
        .header(COOKIE, tampered)
        .send()
        .await?;
    assert_eq!(probe.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn auth_probe_without_a_cookie_is_unauthorized() -> Result<()> {
    let provider = serve(provider_router("alice")).await?;
    let gateway = serve_gateway(&gateway_config(provider, "")).await?;
    let client = client();

    for method in [reqwest::Method::GET, reqwest::Method::POST] {
        let probe = client
            .request(method, format!("http://{gateway}/auth"))
            .send()
            .await?;
        assert_eq!(probe.status(), StatusCode::UNAUTHORIZED);
    }
    Ok(())
}

#[tokio::test]
async fn unknown_paths_are_forbidden_regardless_of_method() -> Result<()> {
    let provider = serve(provider_router("alice")).await?;
    let gateway = serve_gateway(&gateway_config(provider, "")).await?;
    let client = client();

    for method in [
        reqwest::Method::GET,
        reqwest::Method::POST,
        reqwest::Method::DELETE,
    ] {
        let response = client
            .request(method, format!("http://{gateway}/unknown/path"))
            .send()
            .await?;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
    Ok(())
}
