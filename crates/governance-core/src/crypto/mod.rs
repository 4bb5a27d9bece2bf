//! Signing and override-token primitives

pub mod signature;
pub mod token;

pub use signature::{fingerprint, AuditSigner, DEVELOPMENT_SIGNING_KEY};
pub use token::{OverrideToken, OverrideTokenManager, OVERRIDE_VALIDITY_MINUTES};
