//! Keyed message authentication for audit records
//!
//! HMAC-SHA256 with a hex-encoded tag. Verification compares in constant
//! time. The key lives in a [`SecretString`] and is never formatted.

use constant_time_eq::constant_time_eq;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Key used when no signing key is configured. Never acceptable in production.
pub const DEVELOPMENT_SIGNING_KEY: &str = "governance-development-signing-key";

/// Signs and verifies canonical audit payloads
pub struct AuditSigner {
    key: SecretString,
    default_key: bool,
}

impl AuditSigner {
    /// Signer with an explicitly configured key
    pub fn new(key: SecretString) -> Self {
        Self {
            key,
            default_key: false,
        }
    }

    /// Signer using the built-in development key
    pub fn development() -> Self {
        Self {
            key: SecretString::new(DEVELOPMENT_SIGNING_KEY.to_string()),
            default_key: true,
        }
    }

    /// Use the configured key, or fall back to the development key with a warning
    pub fn from_optional(key: Option<SecretString>) -> Self {
        match key {
            Some(key) if !key.expose_secret().trim().is_empty() => Self::new(key),
            _ => {
                tracing::warn!(
                    "No audit signing key configured; audit records will be signed with the development key"
                );
                Self::development()
            }
        }
    }

    /// Whether records are being signed with the development key
    pub fn uses_default_key(&self) -> bool {
        self.default_key
    }

    /// Hex-encoded HMAC-SHA256 over the payload
    pub fn sign(&self, payload: &[u8]) -> String {
        let mut mac = self.mac();
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Check a hex-encoded signature against the payload
    pub fn verify(&self, payload: &[u8], signature: &str) -> bool {
        let expected = self.sign(payload);
        constant_time_eq(expected.as_bytes(), signature.as_bytes())
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(self.key.expose_secret().as_bytes())
            .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"))
    }
}

impl std::fmt::Debug for AuditSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditSigner")
            .field("key", &"[REDACTED]")
            .field("default_key", &self.default_key)
            .finish()
    }
}

/// Short SHA-256 fingerprint for logging a value without revealing it
pub fn fingerprint(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    hex::encode(&digest[..8])
}
