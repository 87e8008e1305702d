//! Glue Data Catalog database plus Athena saved queries.

use super::{CallFailure, classify, describe};
use crate::adapters::{QueryCatalog, QueryRegistration};
use crate::error::CatalogError;
use crate::models::NamedQuery;
use async_trait::async_trait;
use aws_sdk_glue::types::DatabaseInput;
use tracing::debug;

/// `BatchGetNamedQuery` accepts at most this many identifiers per call.
const BATCH_GET_LIMIT: usize = 50;

/// Query catalog backed by the Glue Data Catalog and Athena.
#[derive(Debug, Clone)]
pub struct AthenaQueryCatalog {
    glue: aws_sdk_glue::Client,
    athena: aws_sdk_athena::Client,
    catalog_id: Option<String>,
    work_group: Option<String>,
}

impl AthenaQueryCatalog {
    /// Creates the adapter
    pub fn new(glue: aws_sdk_glue::Client, athena: aws_sdk_athena::Client) -> Self {
        Self {
            glue,
            athena,
            catalog_id: None,
            work_group: None,
        }
    }

    /// Overrides the Data Catalog account (defaults to the caller's)
    pub fn with_catalog_id(mut self, catalog_id: Option<String>) -> Self {
        self.catalog_id = catalog_id;
        self
    }

    /// Registers queries in this work group instead of `primary`
    pub fn with_work_group(mut self, work_group: Option<String>) -> Self {
        self.work_group = work_group;
        self
    }

    fn query_error(query: &str, message: impl Into<String>) -> CatalogError {
        CatalogError::Query {
            query: query.to_string(),
            message: message.into(),
        }
    }

    /// Whether a query named `name` is already saved in the work group.
    async fn find_query(&self, name: &str) -> Result<bool, CatalogError> {
        let mut ids = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let page = self
                .athena
                .list_named_queries()
                .set_work_group(self.work_group.clone())
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| match classify(&e) {
                    CallFailure::Timeout => CatalogError::Timeout {
                        operation: "ListNamedQueries".to_string(),
                    },
                    _ => Self::query_error(name, describe(&e)),
                })?;

            ids.extend(page.named_query_ids().iter().cloned());
            match page.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        for chunk in ids.chunks(BATCH_GET_LIMIT) {
            let batch = self
                .athena
                .batch_get_named_query()
                .set_named_query_ids(Some(chunk.to_vec()))
                .send()
                .await
                .map_err(|e| Self::query_error(name, describe(&e)))?;

            if batch
                .named_queries()
                .iter()
                .any(|saved| saved.name() == name)
            {
                return Ok(true);
            }
        }

        Ok(false)
    }
}

#[async_trait]
impl QueryCatalog for AthenaQueryCatalog {
    async fn ensure_database(&self, name: &str, description: &str) -> Result<bool, CatalogError> {
        let database_error = |message: String| CatalogError::Database {
            database: name.to_string(),
            message,
        };

        let input = DatabaseInput::builder()
            .name(name)
            .description(description)
            .build()
            .map_err(|e| database_error(e.to_string()))?;

        match self
            .glue
            .create_database()
            .set_catalog_id(self.catalog_id.clone())
            .database_input(input)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => match classify(&e) {
                CallFailure::Service(code) if code == "AlreadyExistsException" => {
                    debug!(database = name, "Catalog database already exists");
                    Ok(false)
                }
                CallFailure::Timeout => Err(CatalogError::Timeout {
                    operation: "CreateDatabase".to_string(),
                }),
                _ => Err(database_error(describe(&e))),
            },
        }
    }

    async fn register_query(
        &self,
        database: &str,
        query: &NamedQuery,
    ) -> Result<QueryRegistration, CatalogError> {
        if self.find_query(&query.name).await? {
            return Ok(QueryRegistration::AlreadyPresent);
        }

        let mut request = self
            .athena
            .create_named_query()
            .name(&query.name)
            .database(database)
            .query_string(&query.query)
            .set_work_group(self.work_group.clone());
        if !query.description.is_empty() {
            request = request.description(&query.description);
        }

        let output = request
            .send()
            .await
            .map_err(|e| Self::query_error(&query.name, describe(&e)))?;

        Ok(QueryRegistration::Registered(
            output.named_query_id().unwrap_or_default().to_string(),
        ))
    }
}
