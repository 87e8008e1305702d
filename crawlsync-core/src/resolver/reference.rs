//! Validated secret store references.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// Maximum length of a bare secret name accepted by Secrets Manager.
const MAX_SECRET_NAME_LEN: usize = 512;

/// A reference that does not identify a secret.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid secret reference '{reference}': {reason}")]
pub struct InvalidSecretRef {
    /// The rejected reference
    pub reference: String,
    /// Why it was rejected
    pub reason: &'static str,
}

struct ReferencePatterns {
    arn: Regex,
    name: Regex,
}

impl ReferencePatterns {
    #[allow(clippy::expect_used)]
    fn instance() -> &'static Self {
        static PATTERNS: OnceLock<ReferencePatterns> = OnceLock::new();
        PATTERNS.get_or_init(|| Self {
            arn: Regex::new(
                r"^arn:aws(-[a-z]+)*:secretsmanager:[a-z0-9-]+:\d{12}:secret:[A-Za-z0-9/_+=.@-]+$",
            )
            .expect("Invalid secret ARN pattern"),
            name: Regex::new(r"^[A-Za-z0-9/_+=.@-]+$").expect("Invalid secret name pattern"),
        })
    }
}

/// Identifier of a secret in the secret store: a full Secrets Manager ARN
/// or a bare secret name.
///
/// Only constructible through [`SecretRef::parse`], so resolution never sees
/// a malformed reference.
///
/// # Example
/// ```rust
/// use crawlsync_core::resolver::SecretRef;
///
/// let arn = SecretRef::parse("arn:aws:secretsmanager:us-east-1:123456789012:secret:DBSecret-Aarz2s")?;
/// assert!(arn.as_str().starts_with("arn:aws:secretsmanager:"));
///
/// let name = SecretRef::parse("prod/rds/credentials")?;
/// assert_eq!(name.to_string(), "prod/rds/credentials");
///
/// assert!(SecretRef::parse("has spaces").is_err());
/// # Ok::<(), crawlsync_core::resolver::InvalidSecretRef>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SecretRef(String);

impl SecretRef {
    /// Validates a secret reference.
    ///
    /// # Errors
    /// Returns `InvalidSecretRef` if the value is neither a Secrets Manager
    /// ARN nor a valid secret name.
    pub fn parse(reference: impl Into<String>) -> Result<Self, InvalidSecretRef> {
        let reference = reference.into();
        let invalid = |reason| InvalidSecretRef {
            reference: reference.clone(),
            reason,
        };

        if reference.is_empty() {
            return Err(invalid("reference is empty"));
        }

        let patterns = ReferencePatterns::instance();
        if reference.starts_with("arn:") {
            if !patterns.arn.is_match(&reference) {
                return Err(invalid("not a Secrets Manager secret ARN"));
            }
        } else {
            if reference.len() > MAX_SECRET_NAME_LEN {
                return Err(invalid("secret name longer than 512 characters"));
            }
            if !patterns.name.is_match(&reference) {
                return Err(invalid("secret name contains unsupported characters"));
            }
        }

        Ok(Self(reference))
    }

    /// The reference as passed to the store
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SecretRef {
    type Error = InvalidSecretRef;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<SecretRef> for String {
    fn from(value: SecretRef) -> Self {
        value.0
    }
}
