//! Core data models for crawler configuration.
//!
//! These types describe what is submitted to the crawler service and what
//! comes back. Types that carry the database password keep it in a
//! `Zeroizing` container and redact it from `Debug` output.

use crate::security::{REDACTED, Redactor};
use serde_json::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use zeroize::Zeroizing;

/// JDBC sub-protocols supported by the connection template
/// `jdbc:<protocol>://<host>:<port>/<dbname>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseProtocol {
    /// PostgreSQL (and Aurora PostgreSQL)
    #[default]
    Postgresql,
    /// MySQL (and Aurora MySQL)
    Mysql,
    /// MariaDB
    Mariadb,
    /// Amazon Redshift
    Redshift,
}

impl DatabaseProtocol {
    /// Sub-protocol name used after `jdbc:`.
    pub const fn jdbc_subprotocol(&self) -> &'static str {
        match self {
            Self::Postgresql => "postgresql",
            Self::Mysql => "mysql",
            Self::Mariadb => "mariadb",
            Self::Redshift => "redshift",
        }
    }
}

impl fmt::Display for DatabaseProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.jdbc_subprotocol())
    }
}

/// One JDBC path the crawler should scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanTarget {
    /// Name of the catalog connection the crawler uses
    pub connection_name: String,
    /// Schema/table selector, e.g. `mydb/public/%`
    pub path: String,
}

impl ScanTarget {
    /// Creates a scan target
    pub fn new(connection_name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            connection_name: connection_name.into(),
            path: path.into(),
        }
    }
}

/// Declared type of one column, passed to the crawler as a schema hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaHint {
    /// Column name
    pub column_name: String,
    /// Declared data type, e.g. `int` or `string`
    pub data_type: String,
}

impl SchemaHint {
    /// Creates a schema hint
    pub fn new(column_name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
            data_type: data_type.into(),
        }
    }
}

/// Rejected schema hint lists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaHintError {
    /// Two hints name the same column
    #[error("duplicate schema hint for column '{0}'")]
    DuplicateColumn(String),
    /// A hint has an empty column name
    #[error("schema hint with empty column name")]
    EmptyColumn,
    /// A hint has an empty data type
    #[error("schema hint for column '{0}' has an empty data type")]
    EmptyDataType(String),
}

/// Ordered schema hints with unique column names.
///
/// Declaration order is preserved so the serialized configuration is
/// deterministic for equal inputs.
///
/// # Example
/// ```rust
/// use crawlsync_core::models::{SchemaHint, SchemaHints};
///
/// let hints = SchemaHints::new(vec![
///     SchemaHint::new("id", "int"),
///     SchemaHint::new("name", "string"),
/// ])?;
/// assert_eq!(hints.len(), 2);
///
/// let duplicate = SchemaHints::new(vec![
///     SchemaHint::new("id", "int"),
///     SchemaHint::new("id", "bigint"),
/// ]);
/// assert!(duplicate.is_err());
/// # Ok::<(), crawlsync_core::models::SchemaHintError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<SchemaHint>", into = "Vec<SchemaHint>")]
pub struct SchemaHints(Vec<SchemaHint>);

impl SchemaHints {
    /// Validates and wraps a list of hints.
    ///
    /// # Errors
    /// Returns `SchemaHintError` on duplicate or empty column names and
    /// empty data types.
    pub fn new(hints: Vec<SchemaHint>) -> Result<Self, SchemaHintError> {
        let mut seen = HashSet::with_capacity(hints.len());
        for hint in &hints {
            if hint.column_name.trim().is_empty() {
                return Err(SchemaHintError::EmptyColumn);
            }
            if hint.data_type.trim().is_empty() {
                return Err(SchemaHintError::EmptyDataType(hint.column_name.clone()));
            }
            if !seen.insert(hint.column_name.as_str()) {
                return Err(SchemaHintError::DuplicateColumn(hint.column_name.clone()));
            }
        }
        Ok(Self(hints))
    }

    /// Hints in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &SchemaHint> {
        self.0.iter()
    }

    /// Number of hints
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no hints
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Vec<SchemaHint>> for SchemaHints {
    type Error = SchemaHintError;

    fn try_from(hints: Vec<SchemaHint>) -> Result<Self, Self::Error> {
        Self::new(hints)
    }
}

impl From<SchemaHints> for Vec<SchemaHint> {
    fn from(hints: SchemaHints) -> Self {
        hints.0
    }
}

/// JDBC connection details derived from a secret record.
///
/// # Security
/// The URL carries no credentials and can be logged. The password is only
/// reachable through [`ConnectionDescriptor::expose_password`].
#[derive(Clone)]
pub struct ConnectionDescriptor {
    url: String,
    username: String,
    password: Zeroizing<String>,
}

impl ConnectionDescriptor {
    pub(crate) fn new(url: String, username: String, password: &str) -> Self {
        Self {
            url,
            username,
            password: Zeroizing::new(password.to_string()),
        }
    }

    /// JDBC URL, `jdbc:<protocol>://<host>:<port>/<dbname>`
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Database user
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Exposes the password for payload serialization.
    pub fn expose_password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &REDACTED)
            .finish()
    }
}

/// Everything the crawler needs to connect to and scan the database.
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Connection derived from the secret
    pub connection: ConnectionDescriptor,
    /// Paths to scan, in declaration order
    pub targets: Vec<ScanTarget>,
    /// Column type hints
    pub schema_hints: SchemaHints,
}

/// Wire shape of the `configuration` string handed to the crawler service.
///
/// Field order is part of the contract: equal configs must serialize to
/// byte-identical text.
#[derive(Serialize)]
struct ConfigurationPayload<'a> {
    #[serde(rename = "JDBC_CONNECTION_URL")]
    jdbc_connection_url: &'a str,
    #[serde(rename = "PASSWORD")]
    password: &'a str,
    #[serde(rename = "USERNAME")]
    username: &'a str,
    #[serde(rename = "STORAGE_DESCRIPTOR")]
    storage_descriptor: Vec<StorageDescriptorEntry<'a>>,
}

#[derive(Serialize)]
struct StorageDescriptorEntry<'a> {
    #[serde(rename = "COLUMN_NAME")]
    column_name: &'a str,
    #[serde(rename = "DATA_TYPE")]
    data_type: &'a str,
}

impl CrawlerConfig {
    fn payload<'a>(&'a self, password: &'a str) -> ConfigurationPayload<'a> {
        ConfigurationPayload {
            jdbc_connection_url: self.connection.url(),
            password,
            username: self.connection.username(),
            storage_descriptor: self
                .schema_hints
                .iter()
                .map(|hint| StorageDescriptorEntry {
                    column_name: &hint.column_name,
                    data_type: &hint.data_type,
                })
                .collect(),
        }
    }

    /// Serializes the configuration JSON submitted to the crawler service.
    ///
    /// # Security
    /// The result contains the password; it is returned in a `Zeroizing`
    /// container and must never be logged.
    ///
    /// # Errors
    /// Returns an error if serialization fails
    pub fn to_configuration_json(&self) -> Result<Zeroizing<String>, serde_json::Error> {
        serde_json::to_string(&self.payload(self.connection.expose_password())).map(Zeroizing::new)
    }
}

/// Request handed to a [`CrawlerService`](crate::adapters::CrawlerService).
#[derive(Clone)]
pub struct CrawlerSubmission {
    /// Stable crawler name; the service upserts by this name
    pub crawler_name: String,
    /// IAM role the crawler runs as
    pub role: String,
    /// Catalog database the crawler populates
    pub database_name: String,
    /// JDBC targets to scan
    pub targets: Vec<ScanTarget>,
    configuration_json: Zeroizing<String>,
}

impl CrawlerSubmission {
    pub(crate) fn new(
        crawler_name: String,
        role: String,
        database_name: String,
        targets: Vec<ScanTarget>,
        configuration_json: Zeroizing<String>,
    ) -> Self {
        Self {
            crawler_name,
            role,
            database_name,
            targets,
            configuration_json,
        }
    }

    /// Serialized configuration (contains the password).
    pub fn configuration_json(&self) -> &str {
        &self.configuration_json
    }

    /// The configuration document with the password masked, safe to print.
    ///
    /// Every other string value is passed through `redactor`, so a password
    /// reused as user or database name is masked there too.
    ///
    /// # Errors
    /// Returns an error if the stored configuration is not valid JSON
    pub fn redacted_configuration(&self, redactor: &Redactor) -> Result<Value, serde_json::Error> {
        let mut value: Value = serde_json::from_str(&self.configuration_json)?;
        if let Some(password) = value.get_mut("PASSWORD") {
            *password = Value::String(REDACTED.to_string());
        }
        scrub_strings(&mut value, redactor);
        Ok(value)
    }

    /// Checks whether another submission would leave the crawler unchanged.
    pub fn same_content_as(&self, other: &Self) -> bool {
        self.crawler_name == other.crawler_name
            && self.role == other.role
            && self.database_name == other.database_name
            && self.targets == other.targets
            && self.configuration_json() == other.configuration_json()
    }
}

fn scrub_strings(value: &mut Value, redactor: &Redactor) {
    match value {
        Value::String(text) => *text = redactor.redact(text),
        Value::Array(items) => items.iter_mut().for_each(|item| scrub_strings(item, redactor)),
        Value::Object(fields) => fields
            .values_mut()
            .for_each(|field| scrub_strings(field, redactor)),
        _ => {}
    }
}

impl fmt::Debug for CrawlerSubmission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrawlerSubmission")
            .field("crawler_name", &self.crawler_name)
            .field("role", &self.role)
            .field("database_name", &self.database_name)
            .field("targets", &self.targets)
            .field("configuration_json", &REDACTED)
            .finish()
    }
}

/// What the crawler service did with a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionAction {
    /// The crawler did not exist and was created
    Created,
    /// The crawler existed with different content and was updated in place
    Updated,
    /// The crawler already had identical content
    Unchanged,
}

impl fmt::Display for SubmissionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Updated => write!(f, "updated"),
            Self::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// Acknowledgement of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    /// Crawler the configuration was applied to
    pub crawler_name: String,
    /// What the service did
    pub action: SubmissionAction,
    /// When the service acknowledged the submission
    pub submitted_at: DateTime<Utc>,
}

impl SubmissionReceipt {
    /// Creates a receipt stamped with the current time
    pub fn now(crawler_name: impl Into<String>, action: SubmissionAction) -> Self {
        Self {
            crawler_name: crawler_name.into(),
            action,
            submitted_at: Utc::now(),
        }
    }
}

/// A reusable query registered in the query catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedQuery {
    /// Unique query name
    pub name: String,
    /// Query text
    pub query: String,
    /// Human readable description
    #[serde(default)]
    pub description: String,
}

impl NamedQuery {
    /// Creates a named query
    pub fn new(
        name: impl Into<String>,
        query: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            query: query.into(),
            description: description.into(),
        }
    }
}

/// Named values surfaced after a successful deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningOutputs {
    /// Catalog database name
    #[serde(rename = "GlueDatabaseOutput")]
    pub glue_database: String,
    /// Crawler name
    #[serde(rename = "GlueCrawlerOutput")]
    pub glue_crawler: String,
}

impl fmt::Display for ProvisioningOutputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "GlueDatabaseOutput = {}", self.glue_database)?;
        write!(f, "GlueCrawlerOutput = {}", self.glue_crawler)
    }
}

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;
