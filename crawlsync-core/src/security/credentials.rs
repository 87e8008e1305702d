//! Secure container for database credentials read from the secret store.
//!
//! This module provides the `SecretRecord` struct which holds the five
//! fields of a database secret with automatic memory clearing on drop using
//! the `zeroize` crate.
//!
//! # Security
//! - The password is stored in a `Zeroizing<String>` container
//! - All fields are cleared from memory when the record is dropped
//! - The password is never exposed in debug output or logs

use std::fmt;
use zeroize::{Zeroize, Zeroizing};

/// Keys every database secret must provide, in the order they are reported.
pub const REQUIRED_SECRET_FIELDS: [&str; 5] = ["host", "port", "dbname", "username", "password"];

/// Placeholder printed wherever a secret value would otherwise appear.
pub const REDACTED: &str = "****";

/// Database credentials resolved from the secret store.
///
/// A record is fetched fresh on every resolution and is owned by the
/// resolution call until it is moved into the configurator. `port` is kept
/// exactly as the store provided it; it is range-checked when a connection
/// descriptor is built from it.
///
/// # Example
///
/// ```rust
/// use crawlsync_core::security::SecretRecord;
///
/// let record = SecretRecord::new("db.example.com", "5432", "app", "admin", "secret");
/// assert_eq!(record.host(), "db.example.com");
/// assert!(!format!("{record:?}").contains("secret"));
/// // Everything is zeroed when `record` is dropped
/// ```
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SecretRecord {
    host: String,
    port: String,
    dbname: String,
    username: String,
    password: Zeroizing<String>,
}

impl SecretRecord {
    /// Creates a record from already-validated field values.
    ///
    /// The credential resolver is the normal producer of records; this
    /// constructor does not check for empty fields.
    pub fn new(
        host: impl Into<String>,
        port: impl Into<String>,
        dbname: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: port.into(),
            dbname: dbname.into(),
            username: username.into(),
            password: Zeroizing::new(password.into()),
        }
    }

    /// Database host name or address
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port exactly as stored in the secret
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Database name
    pub fn dbname(&self) -> &str {
        &self.dbname
    }

    /// Database user
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Exposes the password for building the crawler payload.
    ///
    /// # Security
    /// The returned value must only flow into the submission payload or a
    /// [`Redactor`](super::Redactor); never into a log field or message.
    pub fn expose_password(&self) -> &str {
        &self.password
    }

    /// Checks if the password is present without exposing it.
    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }
}

impl fmt::Debug for SecretRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretRecord")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("username", &self.username)
            .field("password", &REDACTED)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_record_accessors() {
        let record = SecretRecord::new("db.example.com", "5432", "mydb", "admin", "hunter2");
        assert_eq!(record.host(), "db.example.com");
        assert_eq!(record.port(), "5432");
        assert_eq!(record.dbname(), "mydb");
        assert_eq!(record.username(), "admin");
        assert_eq!(record.expose_password(), "hunter2");
        assert!(record.has_password());
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let record = SecretRecord::new("db.example.com", "5432", "mydb", "admin", "hunter2");
        let debug = format!("{:?}", record);

        assert!(!debug.contains("hunter2"));
        assert!(debug.contains(REDACTED));
        assert!(debug.contains("db.example.com"));
    }

    #[test]
    fn test_credentials_clone() {
        let record = SecretRecord::new("h", "1", "d", "u", "p");
        let copy = record.clone();
        assert_eq!(record.username(), copy.username());
        assert_eq!(record.expose_password(), copy.expose_password());
    }

    #[test]
    fn test_empty_password_detected() {
        let record = SecretRecord::new("h", "1", "d", "u", "");
        assert!(!record.has_password());
    }
}
