//! Scheduled function handler.
//!
//! Each event runs one [`ScanJobInvocation`] over the profile loaded at cold
//! start. The secret is read again on every event, so a rotated password
//! reaches the crawler on the next scheduled run. A failed invocation is
//! returned as an error result; nothing partial is submitted and the runtime
//! keeps serving events.

use crawlsync_core::{
    CrawlSyncError, CrawlerService, DeploymentProfile, InvocationReport, ProfileOverrides,
    ScanJobInvocation, SecretStore, Trigger,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Environment variable naming the profile file
pub const PROFILE_PATH_ENV: &str = "CRAWLSYNC_PROFILE";

/// Profile path used when [`PROFILE_PATH_ENV`] is unset
pub const DEFAULT_PROFILE_PATH: &str = "crawlsync.toml";

const SCHEDULE_SOURCE: &str = "aws.events";
const SCHEDULE_DETAIL_TYPE: &str = "Scheduled Event";
const SECRETS_MANAGER_SOURCE: &str = "aws.secretsmanager";

/// A failed invocation, returned to the runtime as the event's error.
///
/// # Security
/// Carries only the scrubbed report; no credential reaches the response.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct InvocationFailed {
    /// Stable error label
    pub kind: &'static str,
    /// Scrubbed error text
    pub message: String,
    /// Whether a later event may succeed
    pub retryable: bool,
    /// Full report of the failed run
    pub report: Box<InvocationReport>,
}

/// Maps an incoming event to the trigger it represents.
///
/// EventBridge schedules arrive as `aws.events` "Scheduled Event"s; secret
/// rotation notifications come from `aws.secretsmanager`. Anything else is a
/// manual invocation.
pub fn classify_event(event: &Value) -> Trigger {
    let source = event.get("source").and_then(Value::as_str);
    let detail_type = event.get("detail-type").and_then(Value::as_str);

    match (source, detail_type) {
        (Some(SCHEDULE_SOURCE), Some(SCHEDULE_DETAIL_TYPE)) => Trigger::Scheduled,
        (Some(SECRETS_MANAGER_SOURCE), _) => Trigger::SecretRotation,
        _ => Trigger::Manual,
    }
}

/// Profile path from [`PROFILE_PATH_ENV`], falling back to
/// [`DEFAULT_PROFILE_PATH`].
pub fn profile_path_from_env() -> PathBuf {
    std::env::var(PROFILE_PATH_ENV)
        .ok()
        .filter(|path| !path.trim().is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_PROFILE_PATH), PathBuf::from)
}

/// Loads the profile at `path` and applies the environment overrides the
/// CLI also honors.
///
/// # Errors
/// Returns an error if the file cannot be read, or if the profile or the
/// overrides are invalid.
pub async fn load_profile(path: &Path) -> Result<DeploymentProfile, CrawlSyncError> {
    let overrides = ProfileOverrides::from_env()?;
    let profile = DeploymentProfile::load(path).await?;
    Ok(profile.with_overrides(&overrides)?)
}

/// Runs one invocation for `event`.
///
/// # Errors
/// Returns [`InvocationFailed`] if the invocation ends in `Failed`; the
/// previous crawler definition is then left untouched.
pub async fn handle_event(
    event: &Value,
    profile: &DeploymentProfile,
    secrets: &dyn SecretStore,
    crawler: &dyn CrawlerService,
) -> Result<InvocationReport, InvocationFailed> {
    let trigger = classify_event(event);
    info!(trigger = %trigger, crawler = %profile.crawler.name, "Event received");

    let mut invocation = ScanJobInvocation::new(trigger, profile, secrets, crawler);
    let outcome = invocation.run().await;
    let report = invocation.report(&outcome);

    match outcome {
        Ok(_) => Ok(report),
        Err(error) => Err(InvocationFailed {
            kind: error.kind(),
            message: error.to_string(),
            retryable: error.is_retryable(),
            report: Box::new(report),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crawlsync_core::InvocationState;
    use crawlsync_core::config::{CRAWLER_NAME_ENV, SECRET_ARN_ENV};
    use crawlsync_core::adapters::memory::{
        InMemorySecretStore, RecordingCrawlerService, StoreFailure,
    };
    use serde_json::json;

    const PROFILE: &str = r#"
        [secret]
        reference = "arn:aws:secretsmanager:us-east-1:123456789012:secret:DBSecretD58955BC-Aarz2ser4gmV-bum8C4"

        [crawler]
        role = "arn:aws:iam::123456789012:role/GlueCrawlerRole"
        targets = [{ connection_name = "postgres_connection", path = "my_initial_database/public/test_table" }]

        [retry]
        max_attempts = 1
    "#;

    const SECRET: &str = r#"{"host":"db.example.com","port":"5432","dbname":"my_initial_database","username":"admin","password":"lambda-secret-pw"}"#;

    fn scheduled_event() -> Value {
        json!({
            "version": "0",
            "id": "53dc4d37-cffa-4f76-80c9-8b7d4a4d2eaa",
            "detail-type": "Scheduled Event",
            "source": "aws.events",
            "account": "123456789012",
            "time": "2026-10-16T12:00:00Z",
            "region": "us-east-1",
            "resources": ["arn:aws:events:us-east-1:123456789012:rule/crawlsync-schedule"],
            "detail": {}
        })
    }

    #[test]
    fn test_classify_event() {
        assert_eq!(classify_event(&scheduled_event()), Trigger::Scheduled);
        assert_eq!(
            classify_event(&json!({
                "source": "aws.secretsmanager",
                "detail-type": "AWS API Call via CloudTrail",
                "detail": { "eventName": "RotationSucceeded" }
            })),
            Trigger::SecretRotation
        );
        assert_eq!(
            classify_event(&json!({ "source": "aws.events", "detail-type": "Custom" })),
            Trigger::Manual
        );
        assert_eq!(classify_event(&json!({})), Trigger::Manual);
        assert_eq!(classify_event(&Value::Null), Trigger::Manual);
    }

    #[test]
    fn test_profile_path_from_env() {
        temp_env::with_var_unset(PROFILE_PATH_ENV, || {
            assert_eq!(profile_path_from_env(), PathBuf::from(DEFAULT_PROFILE_PATH));
        });
        temp_env::with_var(PROFILE_PATH_ENV, Some("/var/task/prod.toml"), || {
            assert_eq!(profile_path_from_env(), PathBuf::from("/var/task/prod.toml"));
        });
        temp_env::with_var(PROFILE_PATH_ENV, Some("  "), || {
            assert_eq!(profile_path_from_env(), PathBuf::from(DEFAULT_PROFILE_PATH));
        });
    }

    #[tokio::test]
    async fn test_scheduled_event_submits() {
        let profile = DeploymentProfile::from_toml_str(PROFILE).unwrap();
        let secrets = InMemorySecretStore::new().with_secret(&profile.secret.reference, SECRET);
        let crawler = RecordingCrawlerService::new();

        let report = handle_event(&scheduled_event(), &profile, &secrets, &crawler)
            .await
            .unwrap();

        assert_eq!(report.trigger, Trigger::Scheduled);
        assert_eq!(report.state, InvocationState::Succeeded);
        assert_eq!(crawler.submissions().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_returned_not_raised() {
        let profile = DeploymentProfile::from_toml_str(PROFILE).unwrap();
        let secrets = InMemorySecretStore::new()
            .with_failure(&profile.secret.reference, StoreFailure::AccessDenied);
        let crawler = RecordingCrawlerService::new();

        let failure = handle_event(&scheduled_event(), &profile, &secrets, &crawler)
            .await
            .unwrap_err();

        assert_eq!(failure.kind, "access_denied");
        assert!(!failure.retryable);
        assert_eq!(
            failure.report.state,
            InvocationState::Failed {
                kind: "access_denied"
            }
        );
        assert_eq!(crawler.call_count(), 0);
    }

    #[test]
    fn test_load_profile_applies_env_overrides() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), PROFILE).unwrap();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();

        temp_env::with_vars_unset([SECRET_ARN_ENV, CRAWLER_NAME_ENV], || {
            let profile = runtime.block_on(load_profile(file.path())).unwrap();
            assert_eq!(profile.crawler.name, "pocGlueCrawler");
        });
        temp_env::with_var(CRAWLER_NAME_ENV, Some("rotationCrawler"), || {
            let profile = runtime.block_on(load_profile(file.path())).unwrap();
            assert_eq!(profile.crawler.name, "rotationCrawler");
        });
    }
}
