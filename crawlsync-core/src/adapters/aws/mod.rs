//! AWS-backed adapters: Secrets Manager, Glue and Athena.
//!
//! All three clients share one SDK configuration loaded from the default
//! provider chain, so the CLI and the scheduled function authenticate the
//! same way.

mod athena;
mod glue;
mod secrets_manager;

pub use athena::AthenaQueryCatalog;
pub use glue::GlueCrawlerService;
pub use secrets_manager::SecretsManagerStore;

use aws_config::BehaviorVersion;
use aws_config::timeout::TimeoutConfig;
use aws_sdk_glue::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use std::time::Duration;

/// The service clients used by a deployment.
#[derive(Debug, Clone)]
pub struct AwsServices {
    /// Secrets Manager client
    pub secrets: aws_sdk_secretsmanager::Client,
    /// Glue client, for crawlers and catalog databases
    pub glue: aws_sdk_glue::Client,
    /// Athena client, for named queries
    pub athena: aws_sdk_athena::Client,
}

impl AwsServices {
    /// Loads the shared SDK configuration.
    ///
    /// `operation_timeout` bounds every SDK call including its internal
    /// retries; the pipeline applies its own per-step timeout on top.
    pub async fn load(region: Option<String>, operation_timeout: Duration) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).timeout_config(
            TimeoutConfig::builder()
                .operation_timeout(operation_timeout)
                .build(),
        );
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }
        let config = loader.load().await;

        Self {
            secrets: aws_sdk_secretsmanager::Client::new(&config),
            glue: aws_sdk_glue::Client::new(&config),
            athena: aws_sdk_athena::Client::new(&config),
        }
    }

    /// Secret store over the Secrets Manager client
    pub fn secret_store(&self) -> SecretsManagerStore {
        SecretsManagerStore::new(self.secrets.clone())
    }

    /// Crawler service over the Glue client
    pub fn crawler_service(&self) -> GlueCrawlerService {
        GlueCrawlerService::new(self.glue.clone())
    }

    /// Query catalog over the Glue and Athena clients
    pub fn query_catalog(&self, catalog_id: Option<String>, work_group: Option<String>) -> AthenaQueryCatalog {
        AthenaQueryCatalog::new(self.glue.clone(), self.athena.clone())
            .with_catalog_id(catalog_id)
            .with_work_group(work_group)
    }
}

/// Coarse classification of an SDK call failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CallFailure {
    /// The service answered with this error code
    Service(String),
    /// The call timed out before a response arrived
    Timeout,
    /// The request could not be sent or the response not read
    Transport,
}

pub(crate) fn classify<E, R>(error: &SdkError<E, R>) -> CallFailure
where
    E: ProvideErrorMetadata,
{
    match error {
        SdkError::TimeoutError(_) => CallFailure::Timeout,
        SdkError::DispatchFailure(failure) if failure.is_timeout() => CallFailure::Timeout,
        SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => CallFailure::Transport,
        _ => match error.code() {
            Some(code) => CallFailure::Service(code.to_string()),
            None => CallFailure::Transport,
        },
    }
}

/// Full error chain of an SDK failure, for diagnostics.
pub(crate) fn describe<E, R>(error: &SdkError<E, R>) -> String
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    DisplayErrorContext(error).to_string()
}
