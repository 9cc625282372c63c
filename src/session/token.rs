//! Session token codecs.
//!
//! The stateless codec produces `timestamp.payload.signature`: a decimal
//! millisecond issuance timestamp, the identity payload, and an HMAC-SHA256
//! signature over `timestamp + payload + salt`, base64 encoded with the
//! trailing `=` padding stripped so the value survives as a cookie without
//! quoting. The field order is the wire format; signing and verification
//! must agree on it for the codec's lifetime.
//!
//! The opaque codec is the store-backed sibling: `value.signature` with the
//! signature over `value + salt`, no timestamp and no expiry. Liveness is
//! the session store's problem, not the token's.

use anyhow::{Context, Result};
use base64ct::{Base64Unpadded, Base64UrlUnpadded, Encoding};
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Codec for the stateless strategy: the token itself is authoritative.
#[derive(Clone)]
pub struct SignedTokenCodec {
    secret: SecretString,
    salt: String,
}

impl SignedTokenCodec {
    #[must_use]
    pub fn new(secret: SecretString, salt: impl Into<String>) -> Self {
        Self {
            secret,
            salt: salt.into(),
        }
    }

    /// Sign `payload` into a session token issued at `timestamp_ms`.
    ///
    /// The payload must not contain the `.` separator; verification would
    /// reject the resulting token.
    #[must_use]
    pub fn sign(&self, payload: &str, timestamp_ms: i64) -> String {
        let timestamp = timestamp_ms.to_string();
        let signature = self.signature(&timestamp, payload);
        format!("{timestamp}.{payload}.{signature}")
    }

    /// Verify a token and recover its payload.
    ///
    /// Returns `None` for malformed tokens, expired timestamps (when
    /// `ttl_seconds > 0`) and signature mismatches. The caller never learns
    /// which of those it was.
    #[must_use]
    pub fn verify(&self, token: &str, ttl_seconds: i64) -> Option<String> {
        self.verify_at(token, ttl_seconds, Utc::now().timestamp_millis())
    }

    fn verify_at(&self, token: &str, ttl_seconds: i64, now_ms: i64) -> Option<String> {
        let fields: Vec<&str> = token.splitn(3, '.').collect();
        if fields.len() != 3 {
            return None;
        }
        let (timestamp, payload, signature) = (fields[0], fields[1], fields[2]);

        let timestamp_ms: i64 = timestamp.parse().ok()?;

        // Expired tokens fail before the signature is even computed.
        if ttl_seconds > 0 && now_ms - timestamp_ms > ttl_seconds * 1000 {
            return None;
        }

        let expected = self.signature(timestamp, payload);
        if bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
            Some(payload.to_string())
        } else {
            None
        }
    }

    // The signature is computed over the timestamp exactly as it appears on
    // the wire, not over a re-rendered integer.
    fn signature(&self, timestamp: &str, payload: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .expect("HMAC-SHA256 accepts keys of any length");
        mac.update(timestamp.as_bytes());
        mac.update(payload.as_bytes());
        mac.update(self.salt.as_bytes());
        Base64Unpadded::encode_string(&mac.finalize().into_bytes())
    }
}

/// Codec for the store-backed strategy: two fields, no expiry.
#[derive(Clone)]
pub struct OpaqueTokenCodec {
    secret: SecretString,
    salt: String,
}

impl OpaqueTokenCodec {
    #[must_use]
    pub fn new(secret: SecretString, salt: impl Into<String>) -> Self {
        Self {
            secret,
            salt: salt.into(),
        }
    }

    #[must_use]
    pub fn sign(&self, value: &str) -> String {
        let signature = self.signature(value);
        format!("{value}.{signature}")
    }

    /// Verify a token and recover the opaque identifier.
    #[must_use]
    pub fn verify(&self, token: &str) -> Option<String> {
        let (value, signature) = token.split_once('.')?;
        let expected = self.signature(value);
        if bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
            Some(value.to_string())
        } else {
            None
        }
    }

    fn signature(&self, value: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .expect("HMAC-SHA256 accepts keys of any length");
        mac.update(value.as_bytes());
        mac.update(self.salt.as_bytes());
        Base64Unpadded::encode_string(&mac.finalize().into_bytes())
    }
}

/// Mint a fresh opaque session identifier for the store-backed strategy.
/// The raw value only ever travels inside the signed cookie.
/// # Errors
/// Returns an error if the OS RNG fails.
pub fn generate_session_id() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session identifier")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}
