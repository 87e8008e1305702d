//! Credential resolution from the secret store.
//!
//! The resolver reads a structured database secret by reference and either
//! returns a complete [`SecretRecord`] or a typed [`ResolveError`]. Callers
//! must handle both arms before building anything that depends on the
//! credentials; there is no partially resolved state.
//!
//! # Module Structure
//! - `reference`: validated secret references (ARN or name)
//! - `parse`: JSON secret value parsing

mod parse;
mod reference;

pub use parse::parse_secret_value;
pub use reference::{InvalidSecretRef, SecretRef};

use crate::adapters::SecretStore;
use crate::error::ResolveError;
use crate::security::{Redactor, SecretRecord};
use tracing::{debug, info, warn};

/// Resolves database credentials through a [`SecretStore`].
///
/// The resolver holds no state besides the store handle; every call reads
/// the store again so rotated secrets are picked up immediately.
pub struct CredentialResolver<'a> {
    store: &'a dyn SecretStore,
}

impl<'a> CredentialResolver<'a> {
    /// Creates a resolver backed by `store`
    pub fn new(store: &'a dyn SecretStore) -> Self {
        Self { store }
    }

    /// Reads and validates the secret at `secret_ref`.
    ///
    /// # Security
    /// Only the host, database and user are logged, each scrubbed of the
    /// password.
    ///
    /// # Errors
    /// - `NotFound` if nothing is stored at the reference
    /// - `AccessDenied` if the caller may not read it
    /// - `MalformedSecret` if any of the five required fields is unusable
    /// - `StoreUnavailable` on transient store failures (retryable)
    pub async fn resolve(&self, secret_ref: &SecretRef) -> Result<SecretRecord, ResolveError> {
        debug!(secret = %secret_ref, "Reading database secret");

        let raw = self.store.get(secret_ref).await.map_err(|e| {
            warn!(secret = %secret_ref, kind = e.kind(), "Secret read failed: {}", e);
            e
        })?;

        let record = parse_secret_value(secret_ref, &raw).map_err(|e| {
            warn!(secret = %secret_ref, kind = e.kind(), "Secret rejected: {}", e);
            e
        })?;

        let redactor = Redactor::for_record(&record);
        info!(
            secret = %secret_ref,
            host = %redactor.redact(record.host()),
            dbname = %redactor.redact(record.dbname()),
            username = %redactor.redact(record.username()),
            "Resolved database credentials"
        );

        Ok(record)
    }
}
