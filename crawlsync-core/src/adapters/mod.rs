//! Service adapter traits for the secret store, crawler service and query
//! catalog.
//!
//! The pipeline only talks to these traits, so the deploy path, the
//! scheduled function and the tests all drive the same code against
//! different backends. All traits are object-safe and used through
//! `&dyn` references.
//!
//! # Module Structure
//! - `memory`: In-process implementations for tests and dry runs
//! - `aws`: Secrets Manager, Glue and Athena clients (feature `aws`)

use crate::error::{CatalogError, ResolveError, SubmissionError};
use crate::models::{CrawlerSubmission, NamedQuery, SubmissionReceipt};
use crate::resolver::SecretRef;
use async_trait::async_trait;
use zeroize::Zeroizing;

pub mod memory;

#[cfg(feature = "aws")]
pub mod aws;

/// Read access to stored database secrets.
///
/// # Security
/// Implementations must not log or cache the returned value.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetches the raw secret string stored at `secret_ref`.
    ///
    /// # Errors
    /// Returns `NotFound`, `AccessDenied` or `StoreUnavailable`. Parsing is
    /// the resolver's job, so implementations never return `MalformedSecret`
    /// unless the store holds no string value at all.
    async fn get(&self, secret_ref: &SecretRef) -> Result<Zeroizing<String>, ResolveError>;
}

/// Idempotent create-or-update of a crawler definition.
///
/// Repeating a submission with identical content must leave the service in
/// the same state; the receipt reports `Unchanged` in that case.
#[async_trait]
pub trait CrawlerService: Send + Sync {
    /// Creates the crawler named in `submission`, or brings an existing
    /// crawler of that name in line with it.
    ///
    /// # Errors
    /// Returns `SubmissionError::Rejected` (with `conflict` set for
    /// concurrent modifications) or `SubmissionError::Timeout`.
    async fn create_or_update(
        &self,
        submission: &CrawlerSubmission,
    ) -> Result<SubmissionReceipt, SubmissionError>;
}

/// Outcome of registering a named query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryRegistration {
    /// The query was created with this identifier
    Registered(String),
    /// A query with the same name already exists in the database
    AlreadyPresent,
}

/// Metadata catalog holding the crawler's target database and saved queries.
#[async_trait]
pub trait QueryCatalog: Send + Sync {
    /// Creates the catalog database if missing.
    ///
    /// Returns `true` when the database was created by this call.
    async fn ensure_database(&self, name: &str, description: &str) -> Result<bool, CatalogError>;

    /// Saves `query` against `database` unless one of the same name exists.
    async fn register_query(
        &self,
        database: &str,
        query: &NamedQuery,
    ) -> Result<QueryRegistration, CatalogError>;
}
