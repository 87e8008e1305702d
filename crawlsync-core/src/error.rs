//! Error types with credential-free reporting.
//!
//! Every error in this module carries only identifiers (secret references,
//! crawler names, field names) and service diagnostics that have already been
//! scrubbed of secret values. Database passwords never reach an error message.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to resolve database credentials from the secret store.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No secret exists at the given reference
    #[error("Secret '{secret}' not found")]
    NotFound {
        /// Secret reference that was looked up
        secret: String,
    },

    /// The caller lacks permission to read the secret
    #[error("Access denied reading secret '{secret}'")]
    AccessDenied {
        /// Secret reference that was looked up
        secret: String,
    },

    /// The secret value is missing one or more required keys
    #[error("Secret '{secret}' is malformed: {detail}")]
    MalformedSecret {
        /// Secret reference that was looked up
        secret: String,
        /// Names of the required fields that were missing or unusable
        missing_fields: Vec<String>,
        /// Human readable description (field names only, never values)
        detail: String,
    },

    /// The store could not serve the read: a transient network or service
    /// failure (retryable), or a request the store refused as invalid
    #[error("Secret store unavailable while reading '{secret}': {message}")]
    StoreUnavailable {
        /// Secret reference that was looked up
        secret: String,
        /// Diagnostic from the store client
        message: String,
        /// Whether repeating the same read may succeed
        retryable: bool,
    },
}

impl ResolveError {
    /// Creates a malformed-secret error listing the offending field names.
    pub fn malformed(secret: impl Into<String>, missing_fields: Vec<String>) -> Self {
        let detail = format!("missing required fields: {}", missing_fields.join(", "));
        Self::MalformedSecret {
            secret: secret.into(),
            missing_fields,
            detail,
        }
    }

    /// Creates a malformed-secret error for a value that could not be read at all.
    pub fn unreadable(secret: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::MalformedSecret {
            secret: secret.into(),
            missing_fields: Vec::new(),
            detail: detail.into(),
        }
    }

    /// Creates a transient, retryable store-unavailable error
    pub fn unavailable(secret: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            secret: secret.into(),
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a store-unavailable error for a request the store refused;
    /// repeating it would fail the same way.
    pub fn invalid_request(secret: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            secret: secret.into(),
            message: message.into(),
            retryable: false,
        }
    }

    /// Whether the caller may retry the resolution.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable { retryable: true, .. })
    }

    /// Stable label for logs and function responses.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::AccessDenied { .. } => "access_denied",
            Self::MalformedSecret { .. } => "malformed_secret",
            Self::StoreUnavailable { .. } => "store_unavailable",
        }
    }
}

/// Failure while building or submitting a crawler configuration.
#[derive(Debug, Error)]
pub enum ConfigureError {
    /// A secret field could not be turned into a connection descriptor
    #[error("Failed to build connection from secret field '{field}': {reason}")]
    ConnectionBuildFailure {
        /// Name of the offending secret field
        field: &'static str,
        /// Why the field was rejected (never includes the value)
        reason: String,
    },

    /// The assembled configuration failed local validation
    #[error("Crawler configuration is invalid: {reason}")]
    InvalidConfiguration {
        /// Validation diagnostic
        reason: String,
    },

    /// The crawler service rejected the payload
    #[error("Crawler '{crawler}' rejected the configuration: {message}")]
    SubmissionRejected {
        /// Crawler name the payload was submitted under
        crawler: String,
        /// Service diagnostic, scrubbed of secret values
        message: String,
        /// Rejected because of a concurrent conflicting update
        conflict: bool,
    },

    /// The submission did not complete in time
    #[error("Submission to crawler '{crawler}' timed out: {message}")]
    SubmissionTimeout {
        /// Crawler name the payload was submitted under
        crawler: String,
        /// Timeout diagnostic
        message: String,
    },
}

impl ConfigureError {
    /// Creates a connection build failure for a named secret field
    pub fn connection_build(field: &'static str, reason: impl Into<String>) -> Self {
        Self::ConnectionBuildFailure {
            field,
            reason: reason.into(),
        }
    }

    /// Creates an invalid configuration error
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    /// Whether the caller may retry the submission.
    ///
    /// Timeouts and rejections caused by a concurrent update are transient;
    /// everything else needs a different input to succeed.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::SubmissionRejected { conflict, .. } => *conflict,
            Self::SubmissionTimeout { .. } => true,
            Self::ConnectionBuildFailure { .. } | Self::InvalidConfiguration { .. } => false,
        }
    }

    /// Stable label for logs and function responses.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ConnectionBuildFailure { .. } => "connection_build_failure",
            Self::InvalidConfiguration { .. } => "invalid_configuration",
            Self::SubmissionRejected { .. } => "submission_rejected",
            Self::SubmissionTimeout { .. } => "submission_timeout",
        }
    }
}

/// Error reported by a crawler service implementation.
///
/// Adapters translate their client errors into this shape; the configurator
/// attaches the crawler name and scrubs the message before surfacing it as a
/// [`ConfigureError`].
#[derive(Debug, Clone, Error)]
pub enum SubmissionError {
    /// The service refused the request
    #[error("{message}")]
    Rejected {
        /// Service diagnostic
        message: String,
        /// Refused because another update to the same crawler was in flight
        conflict: bool,
    },

    /// The request did not complete in time
    #[error("{message}")]
    Timeout {
        /// Timeout diagnostic
        message: String,
    },
}

impl SubmissionError {
    /// Creates a non-conflict rejection
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
            conflict: false,
        }
    }

    /// Creates a rejection caused by a concurrent update
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
            conflict: true,
        }
    }

    /// Creates a timeout
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }
}

/// Failure while provisioning the query catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog database could not be created
    #[error("Failed to ensure catalog database '{database}': {message}")]
    Database {
        /// Catalog database name
        database: String,
        /// Service diagnostic
        message: String,
    },

    /// A named query could not be registered
    #[error("Failed to register named query '{query}': {message}")]
    Query {
        /// Named query name
        query: String,
        /// Service diagnostic
        message: String,
    },

    /// The catalog call did not complete in time
    #[error("Catalog operation '{operation}' timed out")]
    Timeout {
        /// Operation that timed out
        operation: String,
    },
}

/// Failure while loading or validating a deployment profile.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// The profile file could not be read
    #[error("Failed to read profile {path}: {source}")]
    Io {
        /// Profile path
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The profile file is not valid TOML for this schema
    #[error("Failed to parse profile: {source}")]
    Parse {
        #[source]
        source: toml::de::Error,
    },

    /// A profile value is out of range or inconsistent
    #[error("Invalid profile: {message}")]
    Invalid {
        /// What is wrong with the profile
        message: String,
    },
}

impl ProfileError {
    /// Creates an invalid profile error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

/// Main error type for crawlsync operations.
///
/// # Security
/// All variants are credential-free; see the module documentation.
#[derive(Debug, Error)]
pub enum CrawlSyncError {
    /// Credential resolution failed
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Crawler configuration failed
    #[error(transparent)]
    Configure(#[from] ConfigureError),

    /// Query catalog provisioning failed
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Deployment profile could not be used
    #[error(transparent)]
    Profile(#[from] ProfileError),

    /// Runtime setup failed (logging, client construction)
    #[error("Configuration error: {message}")]
    Configuration {
        /// What went wrong
        message: String,
    },
}

/// Convenience type alias for Results with `CrawlSyncError`
pub type Result<T> = std::result::Result<T, CrawlSyncError>;

impl CrawlSyncError {
    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether the failed operation may succeed if retried.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Resolve(e) => e.is_retryable(),
            Self::Configure(e) => e.is_retryable(),
            Self::Catalog(CatalogError::Timeout { .. }) => true,
            Self::Catalog(_) | Self::Profile(_) | Self::Configuration { .. } => false,
        }
    }

    /// Stable label for logs and function responses.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Resolve(e) => e.kind(),
            Self::Configure(e) => e.kind(),
            Self::Catalog(_) => "catalog_failure",
            Self::Profile(_) => "invalid_profile",
            Self::Configuration { .. } => "configuration",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_lists_field_names() {
        let error = ResolveError::malformed(
            "db-secret",
            vec!["host".to_string(), "password".to_string()],
        );
        let message = error.to_string();

        assert!(message.contains("db-secret"));
        assert!(message.contains("host, password"));
        assert_eq!(error.kind(), "malformed_secret");
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_retryable_classification() {
        assert!(ResolveError::unavailable("s", "connection reset").is_retryable());
        assert!(!ResolveError::invalid_request("s", "bad parameter").is_retryable());
        assert!(
            !ResolveError::AccessDenied {
                secret: "s".to_string()
            }
            .is_retryable()
        );

        let conflict = ConfigureError::SubmissionRejected {
            crawler: "c".to_string(),
            message: "busy".to_string(),
            conflict: true,
        };
        assert!(conflict.is_retryable());

        let rejected = ConfigureError::SubmissionRejected {
            crawler: "c".to_string(),
            message: "bad input".to_string(),
            conflict: false,
        };
        assert!(!rejected.is_retryable());

        let timeout = ConfigureError::SubmissionTimeout {
            crawler: "c".to_string(),
            message: "30s".to_string(),
        };
        assert!(timeout.is_retryable());
        assert!(!ConfigureError::connection_build("port", "not a number").is_retryable());
    }

    #[test]
    fn test_umbrella_error_delegates() {
        let error: CrawlSyncError = ResolveError::AccessDenied {
            secret: "arn:aws:secretsmanager:us-east-1:123456789012:secret:db".to_string(),
        }
        .into();

        assert_eq!(error.kind(), "access_denied");
        assert!(!error.is_retryable());
        assert!(error.to_string().contains("Access denied"));
    }

    #[test]
    fn test_error_creation() {
        let error = ConfigureError::connection_build("port", "must be between 1 and 65535");
        assert!(error.to_string().contains("'port'"));

        let error = CrawlSyncError::configuration("Failed to initialize logging");
        assert!(error.to_string().contains("Failed to initialize logging"));
    }
}
