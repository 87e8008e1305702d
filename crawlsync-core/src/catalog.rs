//! Catalog provisioning: the crawler's target database and saved queries.

use crate::adapters::{QueryCatalog, QueryRegistration};
use crate::config::{CatalogSettings, RetryConfig};
use crate::error::CatalogError;
use crate::retry::retry_with_backoff;
use serde::Serialize;
use std::time::Duration;
use tracing::info;

/// What happened to one named query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryOutcome {
    /// Query name, unique within the work group
    pub name: String,
    /// Identifier of the newly created query; `None` if it already existed
    pub query_id: Option<String>,
}

/// Applies [`CatalogSettings`] through a [`QueryCatalog`], with the same
/// retry and timeout handling as the rest of the deployment.
pub struct CatalogProvisioner<'a> {
    catalog: &'a dyn QueryCatalog,
    settings: &'a CatalogSettings,
    retry: &'a RetryConfig,
    timeout: Duration,
}

impl<'a> CatalogProvisioner<'a> {
    /// Creates a provisioner for `settings`
    pub fn new(
        catalog: &'a dyn QueryCatalog,
        settings: &'a CatalogSettings,
        retry: &'a RetryConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            settings,
            retry,
            timeout,
        }
    }

    /// Creates the catalog database if it does not exist.
    ///
    /// Returns `true` if it was created by this call.
    pub async fn ensure_database(&self) -> Result<bool, CatalogError> {
        let catalog = self.catalog;
        let name = self.settings.database.as_str();
        let description = self.settings.description.as_str();
        let timeout = self.timeout;

        let created = retry_with_backoff(self.retry, "ensure_database", move || async move {
            tokio::time::timeout(timeout, catalog.ensure_database(name, description))
                .await
                .unwrap_or_else(|_| {
                    Err(CatalogError::Timeout {
                        operation: "ensure_database".to_string(),
                    })
                })
        })
        .await?;

        info!(database = name, created, "Catalog database ready");
        Ok(created)
    }

    /// Registers every configured named query, skipping existing ones.
    ///
    /// Stops at the first query that cannot be registered.
    pub async fn register_queries(&self) -> Result<Vec<QueryOutcome>, CatalogError> {
        let catalog = self.catalog;
        let database = self.settings.database.as_str();
        let timeout = self.timeout;
        let mut outcomes = Vec::with_capacity(self.settings.named_queries.len());

        for query in &self.settings.named_queries {
            let registration =
                retry_with_backoff(self.retry, "register_query", move || async move {
                    tokio::time::timeout(timeout, catalog.register_query(database, query))
                        .await
                        .unwrap_or_else(|_| {
                            Err(CatalogError::Timeout {
                                operation: format!("register_query {}", query.name),
                            })
                        })
                })
                .await?;

            let query_id = match registration {
                QueryRegistration::Registered(id) => {
                    info!(query = %query.name, id = %id, "Named query registered");
                    Some(id)
                }
                QueryRegistration::AlreadyPresent => {
                    info!(query = %query.name, "Named query already present");
                    None
                }
            };
            outcomes.push(QueryOutcome {
                name: query.name.clone(),
                query_id,
            });
        }

        Ok(outcomes)
    }
}
