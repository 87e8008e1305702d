//! The invocation pipeline shared by the deploy CLI and the scheduled
//! function.
//!
//! One [`ScanJobInvocation`] walks
//! `Idle -> ResolvingSecret -> BuildingConfig -> Submitting -> Succeeded`
//! or stops in `Failed(kind)`. Secret reads and submissions are retried on
//! transient errors and bounded by the profile's timeouts. Dropping the
//! `run` future cancels the invocation; nothing is submitted after a failed
//! step, so a failed run leaves the previous crawler definition in place.

use crate::adapters::{CrawlerService, QueryCatalog, SecretStore};
use crate::catalog::{CatalogProvisioner, QueryOutcome};
use crate::config::DeploymentProfile;
use crate::configurator::{ScanJob, ScanJobConfigurator};
use crate::error::{ConfigureError, CrawlSyncError, ResolveError};
use crate::models::{ProvisioningOutputs, SubmissionReceipt};
use crate::resolver::CredentialResolver;
use crate::retry::retry_with_backoff;
use crate::security::{Redactor, SecretRecord};
use serde::Serialize;
use std::fmt;
use tracing::{Instrument, debug, error, info, info_span};
use uuid::Uuid;

/// Identifier carried by an invocation's span and report.
pub type InvocationId = Uuid;

/// What started an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Synchronous deploy-time run from the CLI
    Deploy,
    /// Scheduled event
    Scheduled,
    /// The database secret was rotated
    SecretRotation,
    /// Any other explicit invocation
    Manual,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deploy => write!(f, "deploy"),
            Self::Scheduled => write!(f, "scheduled"),
            Self::SecretRotation => write!(f, "secret_rotation"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// Position of an invocation in its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum InvocationState {
    /// Created, nothing started
    Idle,
    /// Reading the database secret
    ResolvingSecret,
    /// Building and validating the crawler configuration
    BuildingConfig,
    /// Waiting on the crawler service
    Submitting,
    /// The crawler definition was applied
    Succeeded,
    /// Stopped at the first unrecoverable error
    Failed {
        /// Stable error label, see `CrawlSyncError::kind`
        kind: &'static str,
    },
}

impl fmt::Display for InvocationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::ResolvingSecret => write!(f, "resolving_secret"),
            Self::BuildingConfig => write!(f, "building_config"),
            Self::Submitting => write!(f, "submitting"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed { kind } => write!(f, "failed({})", kind),
        }
    }
}

/// Serializable summary of a finished invocation.
///
/// Contains no credentials; the error text is already scrubbed.
#[derive(Debug, Clone, Serialize)]
pub struct InvocationReport {
    /// Identifier also carried by the invocation's log span
    pub invocation_id: InvocationId,
    /// What started the invocation
    pub trigger: Trigger,
    /// Crawler the invocation submitted to
    pub crawler_name: String,
    /// Final state
    pub state: InvocationState,
    /// Every state entered, starting with `Idle`
    pub history: Vec<InvocationState>,
    /// Service receipt on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<SubmissionReceipt>,
    /// Scrubbed error text on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Whether a later run may succeed, on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

/// One run of resolve, build and submit for a deployment profile.
pub struct ScanJobInvocation<'a> {
    id: InvocationId,
    trigger: Trigger,
    profile: &'a DeploymentProfile,
    secrets: &'a dyn SecretStore,
    crawler: &'a dyn CrawlerService,
    catalog: Option<&'a CatalogProvisioner<'a>>,
    database_created: Option<bool>,
    history: Vec<InvocationState>,
}

impl<'a> ScanJobInvocation<'a> {
    /// Creates an idle invocation with a fresh id.
    pub fn new(
        trigger: Trigger,
        profile: &'a DeploymentProfile,
        secrets: &'a dyn SecretStore,
        crawler: &'a dyn CrawlerService,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            trigger,
            profile,
            secrets,
            crawler,
            catalog: None,
            database_created: None,
            history: vec![InvocationState::Idle],
        }
    }

    /// Ensures the catalog database once the configuration has been built,
    /// right before submission. A run that fails earlier leaves the catalog
    /// untouched.
    fn with_catalog(mut self, catalog: &'a CatalogProvisioner<'a>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Current state
    pub fn state(&self) -> InvocationState {
        self.history
            .last()
            .copied()
            .unwrap_or(InvocationState::Idle)
    }

    /// Every state entered so far, starting with `Idle`
    pub fn history(&self) -> &[InvocationState] {
        &self.history
    }

    /// Runs the invocation to a terminal state.
    ///
    /// # Errors
    /// The first non-retryable error, or the last error once the retry
    /// budget is spent. Resolution errors stop the run before any
    /// configuration is built.
    pub async fn run(&mut self) -> Result<SubmissionReceipt, CrawlSyncError> {
        let span = info_span!(
            "invocation",
            id = %self.id,
            trigger = %self.trigger,
            crawler = %self.profile.crawler.name
        );

        async {
            info!("Scan job invocation started");
            let result = self.run_steps().await;
            match &result {
                Ok(receipt) => {
                    self.transition(InvocationState::Succeeded);
                    info!(action = %receipt.action, "Scan job invocation succeeded");
                }
                Err(e) => {
                    self.transition(InvocationState::Failed { kind: e.kind() });
                    error!(kind = e.kind(), retryable = e.is_retryable(), "Scan job invocation failed: {}", e);
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_steps(&mut self) -> Result<SubmissionReceipt, CrawlSyncError> {
        let profile = self.profile;

        self.transition(InvocationState::ResolvingSecret);
        let secret = self.resolve_secret().await?;

        self.transition(InvocationState::BuildingConfig);
        let configurator =
            ScanJobConfigurator::new(self.crawler, ScanJob::from_profile(profile));
        let redactor = Redactor::for_record(&secret);
        let submission = configurator.prepare(
            &secret,
            &profile.crawler.targets,
            &profile.crawler.schema_hints,
        )?;
        drop(secret);

        if let Some(catalog) = self.catalog {
            self.database_created = Some(catalog.ensure_database().await?);
        }

        self.transition(InvocationState::Submitting);
        let configurator = &configurator;
        let submission = &submission;
        let redactor = &redactor;
        let timeout = profile.timeouts.submission();

        let receipt = retry_with_backoff(&profile.retry, "submit_crawler", move || async move {
            match tokio::time::timeout(timeout, configurator.submit(submission, redactor)).await {
                Ok(result) => result,
                Err(_) => Err(ConfigureError::SubmissionTimeout {
                    crawler: submission.crawler_name.clone(),
                    message: format!("no response within {}s", timeout.as_secs()),
                }),
            }
        })
        .await?;

        Ok(receipt)
    }

    async fn resolve_secret(&self) -> Result<SecretRecord, ResolveError> {
        resolve_for_profile(self.profile, self.secrets).await
    }

    fn transition(&mut self, state: InvocationState) {
        debug!(from = %self.state(), to = %state, "State transition");
        self.history.push(state);
    }

    /// Summarizes the invocation once `run` has returned `outcome`.
    pub fn report(&self, outcome: &Result<SubmissionReceipt, CrawlSyncError>) -> InvocationReport {
        InvocationReport {
            invocation_id: self.id,
            trigger: self.trigger,
            crawler_name: self.profile.crawler.name.clone(),
            state: self.state(),
            history: self.history.clone(),
            receipt: outcome.as_ref().ok().cloned(),
            error: outcome.as_ref().err().map(ToString::to_string),
            retryable: outcome.as_ref().err().map(CrawlSyncError::is_retryable),
        }
    }
}

/// Resolves the profile's secret with its retry policy and fetch timeout.
///
/// An elapsed fetch counts as `StoreUnavailable` and is retried like one.
pub async fn resolve_for_profile(
    profile: &DeploymentProfile,
    secrets: &dyn SecretStore,
) -> Result<SecretRecord, ResolveError> {
    let resolver = CredentialResolver::new(secrets);
    let resolver = &resolver;
    let reference = &profile.secret.reference;
    let timeout = profile.timeouts.secret_fetch();

    retry_with_backoff(&profile.retry, "resolve_secret", move || async move {
        match tokio::time::timeout(timeout, resolver.resolve(reference)).await {
            Ok(result) => result,
            Err(_) => Err(ResolveError::unavailable(
                reference.as_str(),
                format!("no response within {}s", timeout.as_secs()),
            )),
        }
    })
    .await
}

/// Result of a full deployment.
#[derive(Debug, Clone, Serialize)]
pub struct Deployment {
    /// Catalog database and crawler names
    pub outputs: ProvisioningOutputs,
    /// Whether this deployment created the catalog database
    pub database_created: bool,
    /// One entry per configured named query
    pub queries: Vec<QueryOutcome>,
    /// The deploy-time invocation
    pub invocation: InvocationReport,
}

/// Deploy-time provisioning: runs the scan job invocation, which ensures the
/// catalog database between building the configuration and submitting it,
/// then registers the named queries.
///
/// Nothing in the catalog changes unless the secret resolved and the
/// configuration validated. The crawler is only submitted once its catalog
/// database exists, and no query is registered unless the crawler submission
/// succeeded.
///
/// # Errors
/// The first failing step's error; later steps are not attempted.
pub async fn provision(
    profile: &DeploymentProfile,
    secrets: &dyn SecretStore,
    crawler: &dyn CrawlerService,
    catalog: &dyn QueryCatalog,
) -> Result<Deployment, CrawlSyncError> {
    let provisioner = CatalogProvisioner::new(
        catalog,
        &profile.catalog,
        &profile.retry,
        profile.timeouts.catalog(),
    );
    let mut invocation =
        ScanJobInvocation::new(Trigger::Deploy, profile, secrets, crawler).with_catalog(&provisioner);
    let outcome = invocation.run().await;
    let report = invocation.report(&outcome);
    let database_created = invocation.database_created.unwrap_or(false);
    outcome?;

    let queries = provisioner.register_queries().await?;

    Ok(Deployment {
        outputs: ProvisioningOutputs {
            glue_database: profile.catalog.database.clone(),
            glue_crawler: profile.crawler.name.clone(),
        },
        database_created,
        queries,
        invocation: report,
    })
}
