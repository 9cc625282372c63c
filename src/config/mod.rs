//! On-disk JSON configuration.
//!
//! The file is created with defaults on first run and saved atomically
//! (temp file + rename) so a crash mid-write never leaves a truncated
//! config behind. Secrets stay plain strings here, since the file is
//! operator edited, and are wrapped in `SecretString` once they enter
//! runtime state.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

pub const CONFIG_FILE: &str = "config.json";
pub const STORAGE_FILE: &str = "storage.json";

/// Which session strategy the gateway runs with, fixed at configuration
/// time. Never auto-detected per request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Signed token carries timestamp + identity; the signature is
    /// authoritative.
    #[default]
    Stateless,
    /// Opaque random identifier; the key-value session store is
    /// authoritative.
    Store,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub port: u16,
    pub address: String,
    pub name: String,
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub redirect_url: String,
    pub default_redirect_url: String,
    pub logins: Vec<String>,
    pub cookie_key: String,
    pub cookie_secret: String,
    pub cookie_salt: String,
    /// Session TTL in seconds; also the cookie Max-Age.
    pub cookie_max_age: i64,
    pub cookie_domain: String,
    pub session_strategy: StrategyKind,
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,
    pub telegram_api_base: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            address: "::0".to_string(),
            name: "Auth".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            authorize_url: "https://oauth.yandex.ru/authorize".to_string(),
            token_url: "https://oauth.yandex.ru/token".to_string(),
            userinfo_url: "https://login.yandex.ru/info?format=json".to_string(),
            redirect_url: "https://example.com/callback".to_string(),
            default_redirect_url: "https://example.com".to_string(),
            logins: Vec::new(),
            cookie_key: "letmein".to_string(),
            cookie_secret: "random".to_string(),
            cookie_salt: String::new(),
            // ~3 months
            cookie_max_age: 7_884_000,
            cookie_domain: ".example.com".to_string(),
            session_strategy: StrategyKind::Stateless,
            telegram_bot_token: String::new(),
            telegram_chat_id: String::new(),
            telegram_api_base: "https://api.telegram.org".to_string(),
        }
    }
}

impl Config {
    /// Load the configuration, creating the file with defaults when it does
    /// not exist yet.
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if the defaults cannot be persisted.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read(path) {
            Ok(data) => serde_json::from_slice(&data)
                .with_context(|| format!("Invalid config file: {}", path.display())),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                let config = Self::default();
                config.save(path)?;
                Ok(config)
            }
            Err(err) => {
                Err(err).with_context(|| format!("Unable to read config: {}", path.display()))
            }
        }
    }

    /// Persist the configuration atomically.
    /// # Errors
    /// Returns an error when the target directory cannot be created or the
    /// file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_vec_pretty(self).context("Unable to serialize config")?;
        write_atomic(path, &data)
    }

    /// Default config path: `$PORDISTO_HOME/config.json` when set, the
    /// platform config dir otherwise.
    /// # Errors
    /// Returns an error if no configuration directory can be determined.
    pub fn default_path() -> Result<PathBuf> {
        Ok(profile_dir()?.join(CONFIG_FILE))
    }

    #[must_use]
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Resolve the directory holding `config.json` and `storage.json`.
pub fn profile_dir() -> Result<PathBuf> {
    if let Ok(place) = std::env::var("PORDISTO_HOME") {
        if !place.is_empty() {
            return Ok(PathBuf::from(place));
        }
    }

    directories::ProjectDirs::from("dev", "pordisto", "pordisto")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| anyhow!("Unable to determine a configuration directory"))
}

/// Write `data` to `path` through a sibling temp file and a rename.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)
        .with_context(|| format!("Unable to create directory: {}", parent.display()))?;

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, data).with_context(|| format!("Unable to write: {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("Unable to replace: {}", path.display()))?;

    Ok(())
}
