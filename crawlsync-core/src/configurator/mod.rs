//! Scan-job configuration: turns resolved credentials into a crawler
//! definition and submits it.
//!
//! Both the deploy path and the scheduled function go through
//! [`ScanJobConfigurator::prepare`], so for the same secret, targets and
//! hints they submit byte-identical configuration payloads.
//!
//! # Module Structure
//! - `connection`: JDBC URL construction from a [`SecretRecord`]

mod connection;

pub use connection::build_connection;

use crate::adapters::CrawlerService;
use crate::config::DeploymentProfile;
use crate::error::{ConfigureError, SubmissionError};
use crate::models::{
    CrawlerConfig, CrawlerSubmission, DatabaseProtocol, ScanTarget, SchemaHints, SubmissionReceipt,
};
use crate::security::{Redactor, SecretRecord};
use crate::validation::{ValidationError, validate_configuration_json};
use tracing::{debug, info};

/// Identity of the crawler a configuration is submitted under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanJob {
    /// Stable crawler name; the idempotency key of every submission
    pub crawler_name: String,
    /// IAM role the crawler runs as
    pub role: String,
    /// Catalog database the crawler writes tables into
    pub database_name: String,
    /// JDBC subprotocol of the source database
    pub protocol: DatabaseProtocol,
}

impl ScanJob {
    /// Takes the crawler identity from a deployment profile
    pub fn from_profile(profile: &DeploymentProfile) -> Self {
        Self {
            crawler_name: profile.crawler.name.clone(),
            role: profile.crawler.role.clone(),
            database_name: profile.catalog.database.clone(),
            protocol: profile.crawler.protocol,
        }
    }
}

/// Builds and submits crawler definitions for one [`ScanJob`].
pub struct ScanJobConfigurator<'a> {
    service: &'a dyn CrawlerService,
    job: ScanJob,
}

impl<'a> ScanJobConfigurator<'a> {
    /// Creates a configurator submitting to `service` as `job`
    pub fn new(service: &'a dyn CrawlerService, job: ScanJob) -> Self {
        Self { service, job }
    }

    /// Assembles the crawler configuration without serializing it.
    ///
    /// # Errors
    /// `ConnectionBuildFailure` for unusable secret fields,
    /// `InvalidConfiguration` if there are no targets or a target is blank.
    pub fn build_config(
        &self,
        secret: &SecretRecord,
        targets: &[ScanTarget],
        schema_hints: &SchemaHints,
    ) -> Result<CrawlerConfig, ConfigureError> {
        if targets.is_empty() {
            return Err(ConfigureError::invalid("at least one scan target is required"));
        }
        if let Some(target) = targets
            .iter()
            .find(|t| t.connection_name.trim().is_empty() || t.path.trim().is_empty())
        {
            return Err(ConfigureError::invalid(format!(
                "scan target '{}' needs both a connection name and a path",
                target.path
            )));
        }

        let connection = build_connection(self.job.protocol, secret)?;
        debug!(
            url = %Redactor::for_record(secret).redact(connection.url()),
            "Built connection descriptor"
        );

        Ok(CrawlerConfig {
            connection,
            targets: targets.to_vec(),
            schema_hints: schema_hints.clone(),
        })
    }

    /// Builds, serializes and validates the submission.
    ///
    /// Nothing is sent; a failure here means the service is never called.
    pub fn prepare(
        &self,
        secret: &SecretRecord,
        targets: &[ScanTarget],
        schema_hints: &SchemaHints,
    ) -> Result<CrawlerSubmission, ConfigureError> {
        let config = self.build_config(secret, targets, schema_hints)?;
        let redactor = Redactor::for_record(secret);

        let configuration_json = config.to_configuration_json().map_err(|e| {
            ConfigureError::invalid(format!("failed to serialize configuration: {}", e))
        })?;
        validate_configuration_json(&configuration_json, &redactor).map_err(|e| match e {
            ValidationError::ValidationFailed { errors, .. } => {
                ConfigureError::invalid(errors.join("; "))
            }
            other => ConfigureError::invalid(redactor.redact(&other.to_string())),
        })?;

        Ok(CrawlerSubmission::new(
            self.job.crawler_name.clone(),
            self.job.role.clone(),
            self.job.database_name.clone(),
            config.targets,
            configuration_json,
        ))
    }

    /// Sends a prepared submission once.
    ///
    /// Service diagnostics are scrubbed with `redactor` before they are
    /// attached to the error.
    pub async fn submit(
        &self,
        submission: &CrawlerSubmission,
        redactor: &Redactor,
    ) -> Result<SubmissionReceipt, ConfigureError> {
        let crawler = submission.crawler_name.clone();
        debug!(crawler = %crawler, "Submitting crawler definition");

        let receipt = self
            .service
            .create_or_update(submission)
            .await
            .map_err(|e| match e {
                SubmissionError::Rejected { message, conflict } => {
                    ConfigureError::SubmissionRejected {
                        crawler: crawler.clone(),
                        message: redactor.redact(&message),
                        conflict,
                    }
                }
                SubmissionError::Timeout { message } => ConfigureError::SubmissionTimeout {
                    crawler: crawler.clone(),
                    message: redactor.redact(&message),
                },
            })?;

        info!(
            crawler = %receipt.crawler_name,
            action = %receipt.action,
            "Crawler configuration applied"
        );
        Ok(receipt)
    }

    /// Builds, validates and submits a crawler definition in one attempt.
    ///
    /// Takes the secret by value; it is zeroized once the submission has
    /// been prepared. Callers wanting retries and timeouts use
    /// [`ScanJobInvocation`](crate::pipeline::ScanJobInvocation).
    pub async fn configure(
        &self,
        secret: SecretRecord,
        targets: &[ScanTarget],
        schema_hints: &SchemaHints,
    ) -> Result<SubmissionReceipt, ConfigureError> {
        let submission = self.prepare(&secret, targets, schema_hints)?;
        let redactor = Redactor::for_record(&secret);
        drop(secret);
        self.submit(&submission, &redactor).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::RecordingCrawlerService;
    use crate::models::{SchemaHint, SubmissionAction};

    const PASSWORD: &str = "correct-horse-battery";

    fn job() -> ScanJob {
        ScanJob {
            crawler_name: "pocGlueCrawler".to_string(),
            role: "arn:aws:iam::123456789012:role/GlueCrawlerRole".to_string(),
            database_name: "postgres_glue_db".to_string(),
            protocol: DatabaseProtocol::Postgresql,
        }
    }

    fn secret() -> SecretRecord {
        SecretRecord::new("db.example.com", "5432", "my_initial_database", "admin", PASSWORD)
    }

    fn targets() -> Vec<ScanTarget> {
        vec![ScanTarget::new(
            "postgres_connection",
            "my_initial_database/public/test_table",
        )]
    }

    fn hints() -> SchemaHints {
        SchemaHints::new(vec![
            SchemaHint::new("id", "int"),
            SchemaHint::new("name", "string"),
            SchemaHint::new("age", "int"),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn test_configure_creates_then_unchanged() {
        let service = RecordingCrawlerService::new();
        let configurator = ScanJobConfigurator::new(&service, job());

        let first = configurator.configure(secret(), &targets(), &hints()).await.unwrap();
        let second = configurator.configure(secret(), &targets(), &hints()).await.unwrap();

        assert_eq!(first.action, SubmissionAction::Created);
        assert_eq!(second.action, SubmissionAction::Unchanged);
        assert_eq!(first.crawler_name, "pocGlueCrawler");

        let submissions = service.submissions();
        assert_eq!(submissions.len(), 2);
        assert_eq!(
            submissions[0].configuration_json().as_bytes(),
            submissions[1].configuration_json().as_bytes()
        );
    }

    #[tokio::test]
    async fn test_rotated_secret_updates() {
        let service = RecordingCrawlerService::new();
        let configurator = ScanJobConfigurator::new(&service, job());
        let rotated =
            SecretRecord::new("db.example.com", "5432", "my_initial_database", "admin", "new-pass");

        configurator.configure(secret(), &targets(), &hints()).await.unwrap();
        let receipt = configurator.configure(rotated, &targets(), &hints()).await.unwrap();

        assert_eq!(receipt.action, SubmissionAction::Updated);
        let stored = service.crawler("pocGlueCrawler").unwrap();
        assert!(stored.configuration_json().contains("new-pass"));
    }

    #[tokio::test]
    async fn test_build_failure_never_submits() {
        let service = RecordingCrawlerService::new();
        let configurator = ScanJobConfigurator::new(&service, job());
        let bad = SecretRecord::new("db.example.com", "99999", "d", "admin", PASSWORD);

        let error = configurator.configure(bad, &targets(), &hints()).await.unwrap_err();

        assert!(matches!(error, ConfigureError::ConnectionBuildFailure { field: "port", .. }));
        assert_eq!(service.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_targets_rejected_locally() {
        let service = RecordingCrawlerService::new();
        let configurator = ScanJobConfigurator::new(&service, job());

        let error = configurator.configure(secret(), &[], &hints()).await.unwrap_err();

        assert!(matches!(error, ConfigureError::InvalidConfiguration { .. }));
        assert_eq!(service.call_count(), 0);
    }

    #[tokio::test]
    async fn test_rejection_message_scrubbed() {
        let service = RecordingCrawlerService::new();
        service.fail_next(SubmissionError::rejected(format!(
            "invalid configuration near \"PASSWORD\":\"{PASSWORD}\""
        )));
        let configurator = ScanJobConfigurator::new(&service, job());

        let error = configurator.configure(secret(), &targets(), &hints()).await.unwrap_err();

        assert!(!error.is_retryable());
        assert!(!error.to_string().contains(PASSWORD));
        assert!(error.to_string().contains("pocGlueCrawler"));
    }

    #[tokio::test]
    async fn test_conflict_and_timeout_are_retryable() {
        let service = RecordingCrawlerService::new();
        service.fail_next(SubmissionError::conflict("ConcurrentModificationException"));
        service.fail_next(SubmissionError::timeout("OperationTimeoutException"));
        let configurator = ScanJobConfigurator::new(&service, job());

        let conflict = configurator.configure(secret(), &targets(), &hints()).await.unwrap_err();
        let timeout = configurator.configure(secret(), &targets(), &hints()).await.unwrap_err();

        assert!(conflict.is_retryable());
        assert!(matches!(timeout, ConfigureError::SubmissionTimeout { .. }));
        assert!(timeout.is_retryable());
    }

    #[test]
    fn test_prepare_is_deterministic_across_configurators() {
        let service_a = RecordingCrawlerService::new();
        let service_b = RecordingCrawlerService::new();

        let a = ScanJobConfigurator::new(&service_a, job())
            .prepare(&secret(), &targets(), &hints())
            .unwrap();
        let b = ScanJobConfigurator::new(&service_b, job())
            .prepare(&secret(), &targets(), &hints())
            .unwrap();

        assert!(a.same_content_as(&b));
        assert_eq!(a.configuration_json().as_bytes(), b.configuration_json().as_bytes());
    }
}
