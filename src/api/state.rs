//! Shared gateway state injected into request handlers.
//!
//! Built once at startup and passed through an `Extension<Arc<_>>`. No
//! process-wide singletons, so tests construct fresh state per case.

use crate::{
    config::{Config, StrategyKind},
    notify::TelegramNotifier,
    oauth::ProviderClient,
    session::{
        FileSessionStore, OpaqueTokenCodec, SessionStrategy, SignedTokenCodec, VerificationCache,
    },
};
use anyhow::Result;
use secrecy::SecretString;
use std::{path::Path, sync::Arc};

pub struct GatewayState {
    cookie_key: String,
    cookie_domain: String,
    cookie_max_age: i64,
    default_redirect_url: String,
    logins: Vec<String>,
    provider: ProviderClient,
    strategy: SessionStrategy,
    cache: VerificationCache,
    notifier: Option<TelegramNotifier>,
}

impl GatewayState {
    /// Wire up codecs, strategy, provider client, cache and notifier from
    /// the loaded configuration. `storage_path` is only touched by the
    /// store-backed strategy.
    /// # Errors
    /// Returns an error when an HTTP client cannot be built or the session
    /// store cannot be opened.
    pub fn from_config(config: &Config, storage_path: &Path) -> Result<Self> {
        let provider = ProviderClient::from_config(config)?;
        let notifier = TelegramNotifier::from_config(config)?;

        let secret = SecretString::from(config.cookie_secret.clone());
        let strategy = match config.session_strategy {
            StrategyKind::Stateless => {
                SessionStrategy::Stateless(SignedTokenCodec::new(secret, &*config.cookie_salt))
            }
            StrategyKind::Store => SessionStrategy::StoreBacked {
                codec: OpaqueTokenCodec::new(secret, &*config.cookie_salt),
                store: Arc::new(FileSessionStore::open(storage_path)?),
            },
        };

        Ok(Self {
            cookie_key: config.cookie_key.clone(),
            cookie_domain: config.cookie_domain.clone(),
            cookie_max_age: config.cookie_max_age,
            default_redirect_url: config.default_redirect_url.clone(),
            logins: config.logins.clone(),
            provider,
            strategy,
            cache: VerificationCache::new(),
            notifier,
        })
    }

    #[must_use]
    pub fn cookie_key(&self) -> &str {
        &self.cookie_key
    }

    #[must_use]
    pub fn cookie_domain(&self) -> &str {
        &self.cookie_domain
    }

    #[must_use]
    pub fn cookie_max_age(&self) -> i64 {
        self.cookie_max_age
    }

    #[must_use]
    pub fn default_redirect_url(&self) -> &str {
        &self.default_redirect_url
    }

    #[must_use]
    pub fn logins(&self) -> &[String] {
        &self.logins
    }

    #[must_use]
    pub fn provider(&self) -> &ProviderClient {
        &self.provider
    }

    #[must_use]
    pub fn strategy(&self) -> &SessionStrategy {
        &self.strategy
    }

    #[must_use]
    pub fn cache(&self) -> &VerificationCache {
        &self.cache
    }

    #[must_use]
    pub fn notifier(&self) -> Option<&TelegramNotifier> {
        self.notifier.as_ref()
    }
}
