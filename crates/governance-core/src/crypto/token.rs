//! Human override tokens
//!
//! A token has the form `OVERRIDE_<issuer>_<issuedAtEpochMillis>_<random>`
//! and is valid for one hour after issuance. Tokens are not revocable and
//! carry no consumption state: the same token may be presented any number
//! of times inside its window.
//!
//! A token whose issue time lies more than five minutes after the current
//! clock reading is rejected. The window only tolerates clock skew between
//! the issuing host and this one.

use chrono::{DateTime, Duration, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};

/// Fixed validity window of an override token
pub const OVERRIDE_VALIDITY_MINUTES: i64 = 60;

const TOKEN_PREFIX: &str = "OVERRIDE";

/// Tolerated difference between the issuer's clock and ours
const MAX_CLOCK_SKEW_SECONDS: i64 = 300;

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^OVERRIDE_(.+)_(\d{1,16})_([A-Za-z0-9]+)$").expect("override token pattern is valid")
    })
}

/// An issued override token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideToken {
    pub token: String,
    pub issuer: String,
    pub issued_at: DateTime<Utc>,
    pub valid_for_minutes: i64,
}

impl OverrideToken {
    /// Parse a token string; `None` when it does not match the token format
    pub fn parse(token: &str) -> Option<Self> {
        let captures = token_pattern().captures(token)?;
        let issuer = captures.get(1)?.as_str();
        let millis: i64 = captures.get(2)?.as_str().parse().ok()?;
        let issued_at = Utc.timestamp_millis_opt(millis).single()?;
        Some(Self {
            token: token.to_string(),
            issuer: issuer.to_string(),
            issued_at,
            valid_for_minutes: OVERRIDE_VALIDITY_MINUTES,
        })
    }

    pub fn validity_window(&self) -> Duration {
        Duration::minutes(self.valid_for_minutes)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.issued_at + self.validity_window()
    }

    /// Valid iff `now - issued_at <= window` and the token is not from the future
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        let age = now - self.issued_at;
        age <= self.validity_window() && age >= -Duration::seconds(MAX_CLOCK_SKEW_SECONDS)
    }
}

/// Issues and validates override tokens
#[derive(Clone)]
pub struct OverrideTokenManager {
    clock: Arc<dyn Clock>,
}

impl Default for OverrideTokenManager {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl OverrideTokenManager {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Issue a token for `actor`, stamped with the current instant
    pub fn issue(&self, actor: &str) -> OverrideToken {
        let issued_at = self.clock.now();
        let random = Uuid::new_v4().simple().to_string();
        let token = format!(
            "{}_{}_{}_{}",
            TOKEN_PREFIX,
            actor,
            issued_at.timestamp_millis(),
            &random[..12]
        );
        let expires_at = issued_at + Duration::minutes(OVERRIDE_VALIDITY_MINUTES);
        tracing::info!(issuer = %actor, expires_at = %expires_at, "Issued override token");
        OverrideToken {
            token,
            issuer: actor.to_string(),
            // Millisecond precision, matching what the token string carries
            issued_at: Utc
                .timestamp_millis_opt(issued_at.timestamp_millis())
                .single()
                .unwrap_or(issued_at),
            valid_for_minutes: OVERRIDE_VALIDITY_MINUTES,
        }
    }

    /// Check a token against an explicit instant; malformed tokens are simply invalid
    pub fn validate(&self, token: &str, now: DateTime<Utc>) -> bool {
        match OverrideToken::parse(token) {
            Some(parsed) => {
                let valid = parsed.is_valid_at(now);
                if !valid {
                    tracing::debug!(issuer = %parsed.issuer, issued_at = %parsed.issued_at, "Override token outside validity window");
                }
                valid
            }
            None => {
                tracing::debug!("Rejected malformed override token");
                false
            }
        }
    }

    /// Check a token against the manager's clock
    pub fn validate_now(&self, token: &str) -> bool {
        self.validate(token, self.clock.now())
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}
