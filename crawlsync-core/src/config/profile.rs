//! Deployment profile: everything one scan job needs besides credentials.

use super::{RetryConfig, TimeoutConfig};
use crate::error::ProfileError;
use crate::models::{DatabaseProtocol, NamedQuery, ScanTarget, SchemaHints};
use crate::resolver::SecretRef;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Environment variable overriding the secret reference.
pub const SECRET_ARN_ENV: &str = "SECRET_ARN";
/// Environment variable overriding the crawler name.
pub const CRAWLER_NAME_ENV: &str = "GLUE_CRAWLER_NAME";

/// Crawler names accepted by the crawler service.
const MAX_CRAWLER_NAME_LEN: usize = 255;

/// Where the database credentials live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecretSettings {
    /// Secret ARN or name holding the five connection fields
    pub reference: SecretRef,
}

/// The crawler definition, minus the connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CrawlerSettings {
    /// Stable crawler name; submissions upsert by it
    #[serde(default = "default_crawler_name")]
    pub name: String,
    /// IAM role ARN, passed through opaquely
    pub role: String,
    /// JDBC subprotocol of the source database
    #[serde(default)]
    pub protocol: DatabaseProtocol,
    /// Paths to scan, at least one
    pub targets: Vec<ScanTarget>,
    /// Column type hints, in declaration order
    #[serde(default)]
    pub schema_hints: SchemaHints,
}

/// Catalog database and saved queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogSettings {
    /// Catalog database the crawler writes tables into
    pub database: String,
    /// Description set when the database is created
    pub description: String,
    /// Data Catalog account, when not the caller's
    pub catalog_id: Option<String>,
    /// Athena work group for the saved queries
    pub work_group: Option<String>,
    /// Saved queries registered at deploy time
    pub named_queries: Vec<NamedQuery>,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            database: "postgres_glue_db".to_string(),
            description: "Glue database for Postgres RDS".to_string(),
            catalog_id: None,
            work_group: None,
            named_queries: vec![
                NamedQuery::new(
                    "first_10_records_query",
                    "SELECT * FROM test_table LIMIT 10;",
                    "Query to retrieve the first 10 records from test_table",
                ),
                NamedQuery::new(
                    "show_all_tables_query",
                    "SELECT tablename FROM pg_catalog.pg_tables WHERE schemaname != 'pg_catalog' AND schemaname != 'information_schema';",
                    "Query to show all tables in the database",
                ),
            ],
        }
    }
}

fn default_crawler_name() -> String {
    "pocGlueCrawler".to_string()
}

/// Complete configuration of one deployment, shared by the CLI and the
/// scheduled function.
///
/// # Example
/// ```rust
/// use crawlsync_core::config::DeploymentProfile;
///
/// let profile = DeploymentProfile::from_toml_str(r#"
///     [secret]
///     reference = "prod/rds/credentials"
///
///     [crawler]
///     role = "arn:aws:iam::123456789012:role/GlueCrawlerRole"
///     targets = [{ connection_name = "postgres_connection", path = "app/public/%" }]
/// "#)?;
///
/// assert_eq!(profile.crawler.name, "pocGlueCrawler");
/// assert_eq!(profile.catalog.database, "postgres_glue_db");
/// # Ok::<(), crawlsync_core::error::ProfileError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeploymentProfile {
    /// AWS region; the SDK default chain is used when absent
    #[serde(default)]
    pub region: Option<String>,
    /// Database secret
    pub secret: SecretSettings,
    /// Crawler identity and scan scope
    pub crawler: CrawlerSettings,
    /// Catalog database and saved queries
    #[serde(default)]
    pub catalog: CatalogSettings,
    /// Retry policy for transient failures
    #[serde(default)]
    pub retry: RetryConfig,
    /// Per-step timeouts
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

impl DeploymentProfile {
    /// Reads, parses and validates a profile file.
    ///
    /// # Errors
    /// `ProfileError::Io`, `ProfileError::Parse` or `ProfileError::Invalid`.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ProfileError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading deployment profile");

        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ProfileError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_toml_str(&text)
    }

    /// Parses and validates a profile.
    pub fn from_toml_str(text: &str) -> Result<Self, ProfileError> {
        let profile: Self = toml::from_str(text).map_err(|source| ProfileError::Parse { source })?;
        profile.validate()?;
        Ok(profile)
    }

    /// Validates profile values beyond what deserialization enforces.
    ///
    /// # Errors
    /// Returns `ProfileError::Invalid` naming the first offending key.
    pub fn validate(&self) -> Result<(), ProfileError> {
        let name = self.crawler.name.trim();
        if name.is_empty() {
            return Err(ProfileError::invalid("crawler.name cannot be empty"));
        }
        if name.len() > MAX_CRAWLER_NAME_LEN {
            return Err(ProfileError::invalid(
                "crawler.name must not exceed 255 characters",
            ));
        }
        if self.crawler.role.trim().is_empty() {
            return Err(ProfileError::invalid("crawler.role cannot be empty"));
        }
        if self.crawler.targets.is_empty() {
            return Err(ProfileError::invalid(
                "crawler.targets must list at least one target",
            ));
        }
        if self
            .crawler
            .targets
            .iter()
            .any(|t| t.connection_name.trim().is_empty() || t.path.trim().is_empty())
        {
            return Err(ProfileError::invalid(
                "every crawler target needs a connection_name and a path",
            ));
        }
        if self.catalog.database.trim().is_empty() {
            return Err(ProfileError::invalid("catalog.database cannot be empty"));
        }

        let mut seen = std::collections::HashSet::new();
        for query in &self.catalog.named_queries {
            if query.name.trim().is_empty() || query.query.trim().is_empty() {
                return Err(ProfileError::invalid(
                    "catalog.named_queries entries need a name and a query",
                ));
            }
            if !seen.insert(query.name.as_str()) {
                return Err(ProfileError::invalid(format!(
                    "duplicate named query '{}'",
                    query.name
                )));
            }
        }

        self.retry.validate()?;
        self.timeouts.validate()
    }

    /// Applies overrides and revalidates.
    pub fn with_overrides(mut self, overrides: &ProfileOverrides) -> Result<Self, ProfileError> {
        if !overrides.is_empty() {
            debug!(
                secret = overrides.secret_reference.is_some(),
                crawler = overrides.crawler_name.is_some(),
                "Applying profile overrides"
            );
        }
        overrides.apply(&mut self);
        self.validate()?;
        Ok(self)
    }
}

/// Values that may be replaced per call site without editing the profile.
///
/// The CLI fills these from flags (which clap also reads from the
/// environment); the scheduled function reads the same variables directly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileOverrides {
    /// Replaces `secret.reference`
    pub secret_reference: Option<SecretRef>,
    /// Replaces `crawler.name`
    pub crawler_name: Option<String>,
}

impl ProfileOverrides {
    /// Reads `SECRET_ARN` and `GLUE_CRAWLER_NAME`; empty values are ignored.
    ///
    /// # Errors
    /// Returns `ProfileError::Invalid` if `SECRET_ARN` is not a valid reference.
    pub fn from_env() -> Result<Self, ProfileError> {
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        let secret_reference = non_empty(SECRET_ARN_ENV)
            .map(SecretRef::parse)
            .transpose()
            .map_err(|e| ProfileError::invalid(format!("{}: {}", SECRET_ARN_ENV, e)))?;

        Ok(Self {
            secret_reference,
            crawler_name: non_empty(CRAWLER_NAME_ENV),
        })
    }

    /// Whether no value would be replaced
    pub fn is_empty(&self) -> bool {
        self.secret_reference.is_none() && self.crawler_name.is_none()
    }

    fn apply(&self, profile: &mut DeploymentProfile) {
        if let Some(reference) = &self.secret_reference {
            profile.secret.reference = reference.clone();
        }
        if let Some(name) = &self.crawler_name {
            profile.crawler.name = name.clone();
        }
    }
}
