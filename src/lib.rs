//! # Pordisto (OAuth2 Authentication Gateway)
//!
//! `pordisto` brokers a third-party OAuth2 login flow and converts a
//! successful login into a locally issued, HMAC-signed session token carried
//! as an HTTP cookie. A cheap `/auth` verification endpoint lets a reverse
//! proxy (e.g. nginx `auth_request`) validate every incoming request without
//! talking to the identity provider again.
//!
//! ## Session strategies
//!
//! Two deployment variants share the codec shape and cache discipline:
//!
//! - **Stateless** (default): the token itself carries the issuance
//!   timestamp and the identity; the signature is authoritative and the
//!   allow-list is re-checked on every cache miss.
//! - **Store-backed**: the token carries an opaque random identifier whose
//!   validity is confirmed against a key-value session store; the allow-list
//!   is checked at issuance only.
//!
//! ## Verification pipeline
//!
//! `/auth` extracts the configured cookie, consults a bounded LRU memo of
//! recent verification outcomes (128 entries, one-hour TTL) and falls back
//! to signature verification plus allow-list or store lookup. The endpoint
//! answers 200 or 401 with no body and never reveals *why* verification
//! failed.
//!
//! Every route other than `/`, `/callback` and `/auth` answers 403; the
//! surface is deny-by-default.

pub mod api;
pub mod cli;
pub mod config;
pub mod notify;
pub mod oauth;
pub mod session;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
