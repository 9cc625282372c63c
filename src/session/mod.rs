//! Session issuance and validation.
//!
//! [`SessionStrategy`] is the deployment-time choice between the stateless
//! signed token and the store-backed opaque token. The strategy owns
//! issuance (what goes into the cookie after a successful login) and
//! validation (what the auth gate runs on a cache miss).

pub mod cache;
pub mod store;
pub mod token;

pub use self::cache::VerificationCache;
pub use self::store::{FileSessionStore, SessionStore};
pub use self::token::{OpaqueTokenCodec, SignedTokenCodec};

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::error;

pub enum SessionStrategy {
    /// The token carries timestamp + identity; its signature is
    /// authoritative. The allow-list is re-checked on every validation so a
    /// post-issuance removal takes effect once the cached outcome expires.
    Stateless(SignedTokenCodec),
    /// The token carries an opaque identifier; the store is authoritative.
    /// The allow-list only applies at issuance.
    StoreBacked {
        codec: OpaqueTokenCodec,
        store: Arc<dyn SessionStore>,
    },
}

impl SessionStrategy {
    /// Mint a new session token for an allow-listed login.
    /// # Errors
    /// Returns an error when the session identifier cannot be generated or
    /// the store write fails.
    pub async fn issue(&self, login: &str) -> Result<String> {
        match self {
            Self::Stateless(codec) => Ok(codec.sign(login, Utc::now().timestamp_millis())),
            Self::StoreBacked { codec, store } => {
                let id = token::generate_session_id()?;
                store.set_key(&id, login).await?;
                Ok(codec.sign(&id))
            }
        }
    }

    /// Validate a raw cookie value. Collapses every failure mode to `false`;
    /// store lookup errors are logged and count as invalid.
    pub async fn validate(&self, raw: &str, ttl_seconds: i64, logins: &[String]) -> bool {
        match self {
            Self::Stateless(codec) => match codec.verify(raw, ttl_seconds) {
                Some(login) => logins.contains(&login),
                None => false,
            },
            Self::StoreBacked { codec, store } => match codec.verify(raw) {
                Some(id) => match store.has_key(&id).await {
                    Ok(found) => found,
                    Err(err) => {
                        error!("Session store lookup failed: {err}");
                        false
                    }
                },
                None => false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn allow_list() -> Vec<String> {
        vec!["alice".to_string(), "bob".to_string()]
    }

    fn stateless() -> SessionStrategy {
        SessionStrategy::Stateless(SignedTokenCodec::new(
            SecretString::from("super-secret".to_string()),
            "pepper",
        ))
    }

    #[tokio::test]
    async fn stateless_issue_then_validate() {
        let strategy = stateless();
        let token = strategy.issue("alice").await.unwrap();
        assert!(strategy.validate(&token, 3600, &allow_list()).await);
    }

    #[tokio::test]
    async fn stateless_rejects_login_removed_from_allow_list() {
        let strategy = stateless();
        let token = strategy.issue("alice").await.unwrap();
        let shrunk = vec!["bob".to_string()];
        assert!(!strategy.validate(&token, 3600, &shrunk).await);
    }

    #[tokio::test]
    async fn stateless_rejects_garbage() {
        let strategy = stateless();
        assert!(!strategy.validate("garbage", 3600, &allow_list()).await);
    }

    #[tokio::test]
    async fn store_backed_issue_then_validate() {
        let dir = tempfile::tempdir().unwrap();
        let strategy = SessionStrategy::StoreBacked {
            codec: OpaqueTokenCodec::new(SecretString::from("super-secret".to_string()), "pepper"),
            store: Arc::new(FileSessionStore::open(dir.path().join("storage.json")).unwrap()),
        };

        let token = strategy.issue("alice").await.unwrap();
        // The store, not the allow-list, is authoritative for validation.
        assert!(strategy.validate(&token, 3600, &[]).await);
    }

    #[tokio::test]
    async fn store_backed_rejects_unknown_identifier() {
        let dir = tempfile::tempdir().unwrap();
        let codec = OpaqueTokenCodec::new(SecretString::from("super-secret".to_string()), "pepper");
        let strategy = SessionStrategy::StoreBacked {
            codec: codec.clone(),
            store: Arc::new(FileSessionStore::open(dir.path().join("storage.json")).unwrap()),
        };

        // Correctly signed but never written to the store.
        let token = codec.sign("never-stored");
        assert!(!strategy.validate(&token, 3600, &allow_list()).await);
    }
}
