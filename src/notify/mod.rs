//! Best-effort login notifications over the Telegram bot API.
//!
//! Disabled unless both a bot token and a chat id are configured. The
//! caller runs this on a detached task after the login response has been
//! built; a delivery failure is logged and goes no further.

use crate::config::Config;
use anyhow::{bail, Context, Result};
use chrono::Local;
use reqwest::header::CONTENT_TYPE;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct Message<'a> {
    chat_id: &'a str,
    text: String,
    parse_mode: &'a str,
}

#[derive(Debug, Deserialize)]
struct Delivery {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    description: String,
}

#[derive(Clone)]
pub struct TelegramNotifier {
    http: reqwest::Client,
    api_base: String,
    bot_token: SecretString,
    chat_id: String,
}

impl TelegramNotifier {
    /// Build a notifier from configuration; `None` when notifications are
    /// not configured.
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_config(config: &Config) -> Result<Option<Self>> {
        if config.telegram_bot_token.is_empty() || config.telegram_chat_id.is_empty() {
            return Ok(None);
        }

        let http = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(NOTIFY_TIMEOUT)
            .build()
            .context("Error creating HTTP client")?;

        Ok(Some(Self {
            http,
            api_base: config.telegram_api_base.clone(),
            bot_token: SecretString::from(config.telegram_bot_token.clone()),
            chat_id: config.telegram_chat_id.clone(),
        }))
    }

    /// Report a successful login with the local date and time.
    /// # Errors
    /// Transport failures, non-JSON responses and `ok=false` replies are
    /// all errors; the caller decides they are only worth a log line.
    pub async fn send_login_event(&self, login: &str) -> Result<()> {
        let now = Local::now();
        let text = format!(
            "New login: user `{login}` signed in on {} at {}.",
            now.format("%d-%m-%Y"),
            now.format("%H:%M:%S"),
        );

        let url = format!(
            "{}/bot{}/sendMessage",
            self.api_base.trim_end_matches('/'),
            self.bot_token.expose_secret(),
        );

        let response = self
            .http
            .post(&url)
            .json(&Message {
                chat_id: &self.chat_id,
                text,
                parse_mode: "Markdown",
            })
            .send()
            .await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.starts_with("application/json") {
            bail!(response.text().await.unwrap_or_default());
        }

        let delivery: Delivery = response.json().await?;
        if !delivery.ok {
            bail!("Telegram error: {}", delivery.description);
        }

        Ok(())
    }
}
