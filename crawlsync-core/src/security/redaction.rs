//! Scrubbing of known secret values from outbound text.
//!
//! Service diagnostics can echo parts of a request back. Before such text is
//! attached to an error, logged or returned from a function invocation it is
//! passed through a [`Redactor`] that knows the secret values of the current
//! invocation.

use super::credentials::{REDACTED, SecretRecord};
use zeroize::Zeroizing;

/// Replaces every occurrence of registered secret values with `****`.
///
/// # Example
/// ```rust
/// use crawlsync_core::security::Redactor;
///
/// let redactor = Redactor::new().with_secret("hunter2");
/// assert_eq!(redactor.redact("login with hunter2 failed"), "login with **** failed");
/// ```
#[derive(Default, Clone)]
pub struct Redactor {
    secrets: Vec<Zeroizing<String>>,
}

impl Redactor {
    /// Creates an empty redactor
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a redactor that scrubs the password of a secret record.
    pub fn for_record(record: &SecretRecord) -> Self {
        Self::new().with_secret(record.expose_password())
    }

    /// Builder method to register another secret value.
    ///
    /// Every non-empty value is registered, however short; scrubbing a short
    /// password may also mask unrelated text that happens to contain it.
    pub fn with_secret(mut self, secret: &str) -> Self {
        if !secret.is_empty() {
            self.secrets.push(Zeroizing::new(secret.to_string()));
            // Longest first so a secret containing another is replaced whole
            self.secrets.sort_by_key(|s| std::cmp::Reverse(s.len()));
        }
        self
    }

    /// Returns `text` with every registered secret replaced.
    pub fn redact(&self, text: &str) -> String {
        self.secrets
            .iter()
            .fold(text.to_string(), |acc, secret| {
                acc.replace(secret.as_str(), REDACTED)
            })
    }

    /// Checks whether `text` contains any registered secret.
    pub fn contains_secret(&self, text: &str) -> bool {
        self.secrets.iter().any(|secret| text.contains(secret.as_str()))
    }
}

impl std::fmt::Debug for Redactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Redactor")
            .field("secrets", &self.secrets.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_replaces_every_occurrence() {
        let redactor = Redactor::new().with_secret("s3cr3t");
        let redacted = redactor.redact("s3cr3t and again s3cr3t");

        assert_eq!(redacted, "**** and again ****");
        assert!(!redactor.contains_secret(&redacted));
    }

    #[test]
    fn test_redact_longest_secret_first() {
        let redactor = Redactor::new().with_secret("abc").with_secret("abcdef");
        assert_eq!(redactor.redact("xx abcdef yy"), "xx **** yy");
    }

    #[test]
    fn test_redact_for_record() {
        let record = SecretRecord::new("db", "5432", "app", "admin", "topsecret");
        let redactor = Redactor::for_record(&record);

        assert_eq!(
            redactor.redact("invalid input: PASSWORD=topsecret"),
            "invalid input: PASSWORD=****"
        );
        // Non-secret fields are left alone
        assert_eq!(redactor.redact("admin@db"), "admin@db");
    }

    #[test]
    fn test_redact_ignores_empty_secret() {
        let redactor = Redactor::new().with_secret("");
        assert_eq!(redactor.redact("a banana"), "a banana");
        assert!(!redactor.contains_secret("a banana"));
    }

    #[test]
    fn test_redact_short_password() {
        let record = SecretRecord::new("db", "5432", "app", "admin", "Q7");
        let redactor = Redactor::for_record(&record);

        let redacted = redactor.redact("bad PASSWORD value Q7 rejected");
        assert_eq!(redacted, "bad PASSWORD value **** rejected");
        assert!(!redacted.contains("Q7"));
    }

    #[test]
    fn test_redactor_debug_hides_values() {
        let redactor = Redactor::new().with_secret("hunter2");
        assert!(!format!("{redactor:?}").contains("hunter2"));
    }
}
