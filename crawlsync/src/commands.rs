//! Command execution over the service traits.
//!
//! Every command takes the services as trait objects so the binary can pass
//! the AWS clients and the tests can pass in-memory ones.

use crate::Command;
use crawlsync_core::configurator::build_connection;
use crawlsync_core::{
    CrawlSyncError, CrawlerService, Deployment, DeploymentProfile, InvocationReport,
    InvocationState, QueryCatalog, ScanJob, ScanJobConfigurator, ScanJobInvocation, ScanTarget,
    Redactor, SecretStore, Trigger, provision, resolve_for_profile,
};
use serde::Serialize;
use tracing::info;

/// Service handles a command runs against.
#[derive(Clone, Copy)]
pub struct Services<'a> {
    /// Where the database secret is read from
    pub secrets: &'a dyn SecretStore,
    /// Where crawler definitions are submitted
    pub crawler: &'a dyn CrawlerService,
    /// Catalog database and saved queries
    pub catalog: &'a dyn QueryCatalog,
}

/// Configuration that `plan` would submit.
#[derive(Debug, Clone, Serialize)]
pub struct PlanPreview {
    /// Crawler the configuration would be submitted under
    pub crawler_name: String,
    /// IAM role the crawler runs as
    pub role: String,
    /// Catalog database the crawler writes into
    pub database_name: String,
    /// JDBC targets, in submission order
    pub targets: Vec<ScanTarget>,
    /// Submitted configuration with the password replaced by `****`
    pub configuration: serde_json::Value,
}

/// Non-secret view of a resolved database secret.
#[derive(Debug, Clone, Serialize)]
pub struct SecretSummary {
    /// Secret reference that was read
    pub secret: String,
    /// Database host, scrubbed of the password
    pub host: String,
    /// Port as stored
    pub port: String,
    /// Database name, scrubbed of the password
    pub dbname: String,
    /// User name, scrubbed of the password
    pub username: String,
    /// Whether a password is set; the value itself is never shown
    pub password_present: bool,
    /// JDBC URL the crawler would use, scrubbed of the password
    pub connection_url: String,
}

/// Result of a command, rendered by [`crate::output`].
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CommandReport {
    /// `deploy`
    Deployment(Box<Deployment>),
    /// `configure`
    Invocation(InvocationReport),
    /// `plan`
    Plan(PlanPreview),
    /// `check-secret`
    Secret(SecretSummary),
}

impl CommandReport {
    /// Error text of a failed invocation, if the command ran one that failed.
    pub fn failure(&self) -> Option<&str> {
        match self {
            Self::Invocation(report) if report.state != InvocationState::Succeeded => {
                Some(report.error.as_deref().unwrap_or("invocation failed"))
            }
            _ => None,
        }
    }
}

/// Runs `command` for `profile`.
///
/// # Errors
/// Returns the first failing step's error. `configure` reports a failed
/// invocation through [`CommandReport::failure`] instead, so its report can
/// still be printed.
pub async fn execute(
    command: Command,
    profile: &DeploymentProfile,
    services: Services<'_>,
) -> Result<CommandReport, CrawlSyncError> {
    match command {
        Command::Deploy => deploy(profile, services).await,
        Command::Configure => Ok(configure(profile, services).await),
        Command::Plan => plan(profile, services).await,
        Command::CheckSecret => check_secret(profile, services).await,
    }
}

async fn deploy(
    profile: &DeploymentProfile,
    services: Services<'_>,
) -> Result<CommandReport, CrawlSyncError> {
    info!(crawler = %profile.crawler.name, "Deploying");
    let deployment = provision(profile, services.secrets, services.crawler, services.catalog).await?;
    Ok(CommandReport::Deployment(Box::new(deployment)))
}

async fn configure(profile: &DeploymentProfile, services: Services<'_>) -> CommandReport {
    let mut invocation =
        ScanJobInvocation::new(Trigger::Manual, profile, services.secrets, services.crawler);
    let outcome = invocation.run().await;
    CommandReport::Invocation(invocation.report(&outcome))
}

async fn plan(
    profile: &DeploymentProfile,
    services: Services<'_>,
) -> Result<CommandReport, CrawlSyncError> {
    let secret = resolve_for_profile(profile, services.secrets).await?;
    let redactor = Redactor::for_record(&secret);

    let configurator = ScanJobConfigurator::new(services.crawler, ScanJob::from_profile(profile));
    // Runs the same validation a submission would, without sending anything
    let submission = configurator.prepare(
        &secret,
        &profile.crawler.targets,
        &profile.crawler.schema_hints,
    )?;
    drop(secret);

    let configuration = submission
        .redacted_configuration(&redactor)
        .map_err(|e| CrawlSyncError::configuration(format!("Failed to render plan: {}", e)))?;

    Ok(CommandReport::Plan(PlanPreview {
        crawler_name: submission.crawler_name.clone(),
        role: submission.role.clone(),
        database_name: submission.database_name.clone(),
        targets: submission.targets.clone(),
        configuration,
    }))
}

async fn check_secret(
    profile: &DeploymentProfile,
    services: Services<'_>,
) -> Result<CommandReport, CrawlSyncError> {
    let secret = resolve_for_profile(profile, services.secrets).await?;
    let connection = build_connection(profile.crawler.protocol, &secret)?;
    let redactor = Redactor::for_record(&secret);

    Ok(CommandReport::Secret(SecretSummary {
        secret: profile.secret.reference.to_string(),
        host: redactor.redact(secret.host()),
        port: redactor.redact(secret.port()),
        dbname: redactor.redact(secret.dbname()),
        username: redactor.redact(secret.username()),
        password_present: secret.has_password(),
        connection_url: redactor.redact(connection.url()),
    }))
}
