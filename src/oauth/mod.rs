//! OAuth2 provider client: authorization redirect, code exchange, userinfo.
//!
//! The provider's messages are surfaced verbatim: a non-JSON response body
//! or an `error`/`error_description` field travels back to the caller
//! unmodified. No retries; a transient provider failure is the end user's
//! 500.

use crate::api::error::GatewayError;
use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

// Bounded timeout on every outbound call so a hung provider cannot pin
// request handlers indefinitely.
const OUTBOUND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct ProviderClient {
    http: reqwest::Client,
    authorize_url: String,
    token_url: String,
    userinfo_url: String,
    client_id: String,
    client_secret: SecretString,
    redirect_url: String,
}

/// Token endpoint response. Error fields coexist with the success fields;
/// the provider decides which half is populated.
#[derive(Debug, Default, Deserialize)]
pub struct AccessToken {
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub error: Option<String>,

    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub scope: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub psuid: String,
}

impl ProviderClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(OUTBOUND_TIMEOUT)
            .build()
            .context("Error creating HTTP client")?;

        Ok(Self {
            http,
            authorize_url: config.authorize_url.clone(),
            token_url: config.token_url.clone(),
            userinfo_url: config.userinfo_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: SecretString::from(config.client_secret.clone()),
            redirect_url: config.redirect_url.clone(),
        })
    }

    /// Build the provider authorization URL carrying `origin` round-tripped
    /// inside the `state` parameter. The origin ends up double-encoded: once
    /// into the `origin=<origin>` pair, once more as part of the outer query.
    /// # Errors
    /// Returns an error when the configured authorization URL is not a URL.
    pub fn authorize_redirect(&self, origin: &str) -> Result<String, GatewayError> {
        let state = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("origin", origin)
            .finish();

        let mut url = Url::parse(&self.authorize_url)
            .map_err(|err| GatewayError::Internal(anyhow!("Invalid authorize URL: {err}")))?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_url)
            .append_pair("state", &state);

        Ok(url.into())
    }

    /// Exchange an authorization code for an access token.
    /// # Errors
    /// Transport failures, non-JSON responses and provider-reported errors
    /// all surface; the provider's message is carried verbatim.
    pub async fn exchange_code(&self, code: &str) -> Result<AccessToken, GatewayError> {
        let response = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(self.client_secret.expose_secret()))
            .form(&[("grant_type", "authorization_code"), ("code", code)])
            .send()
            .await?;

        let token: AccessToken = parse_json_response(response).await?;

        if let Some(message) = token.error_description.as_deref().filter(|m| !m.is_empty()) {
            return Err(GatewayError::UpstreamRejection(message.to_string()));
        }
        if let Some(message) = token.error.as_deref().filter(|m| !m.is_empty()) {
            return Err(GatewayError::UpstreamRejection(message.to_string()));
        }

        Ok(token)
    }

    /// Fetch the user identity behind an access token.
    /// # Errors
    /// Same discipline as [`ProviderClient::exchange_code`].
    pub async fn fetch_userinfo(&self, access_token: &str) -> Result<UserInfo, GatewayError> {
        let response = self
            .http
            .get(&self.userinfo_url)
            .header(AUTHORIZATION, format!("OAuth {access_token}"))
            .send()
            .await?;

        parse_json_response(response).await
    }
}

async fn parse_json_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, GatewayError> {
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    if !content_type.starts_with("application/json") {
        let body = response.text().await.unwrap_or_default();
        return Err(GatewayError::UpstreamProtocol(body));
    }

    Ok(response.json::<T>().await?)
}
