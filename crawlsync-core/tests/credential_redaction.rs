//! Security tests: the database password never leaves the core in logs,
//! errors or reports, whichever way an invocation ends.

#![allow(clippy::unwrap_used)]

use crawlsync_core::adapters::memory::{InMemorySecretStore, RecordingCrawlerService};
use crawlsync_core::{DeploymentProfile, ScanJobInvocation, SubmissionError, Trigger};
use std::io;
use std::sync::{Arc, Mutex, PoisonError};

const PASSWORD: &str = "Tr0ub4dor-and-3";

/// In-memory log sink shared with the subscriber.
#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl io::Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn capture(format_json: bool) -> (SharedBuf, tracing::subscriber::DefaultGuard) {
    let buf = SharedBuf::default();
    let writer = buf.clone();
    let builder = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false);

    let guard = if format_json {
        tracing::subscriber::set_default(builder.json().with_current_span(true).finish())
    } else {
        tracing::subscriber::set_default(builder.finish())
    };
    (buf, guard)
}

fn profile() -> DeploymentProfile {
    DeploymentProfile::from_toml_str(
        r#"
        [secret]
        reference = "prod/analytics-db"

        [crawler]
        name = "analyticsCrawler"
        role = "arn:aws:iam::123456789012:role/GlueCrawlerRole"
        targets = [{ connection_name = "analytics", path = "analytics/public/%" }]

        [retry]
        max_attempts = 1
        "#,
    )
    .unwrap()
}

fn secret_json() -> String {
    serde_json::json!({
        "host": "analytics.internal",
        "port": 5432,
        "dbname": "analytics",
        "username": "reporter",
        "password": PASSWORD,
    })
    .to_string()
}

#[tokio::test]
async fn test_credential_absent_from_logs_on_success() {
    for json in [false, true] {
        let (logs, _guard) = capture(json);
        let profile = profile();
        let secrets = InMemorySecretStore::new().with_secret(&profile.secret.reference, &secret_json());
        let crawler = RecordingCrawlerService::new();

        let mut invocation = ScanJobInvocation::new(Trigger::Scheduled, &profile, &secrets, &crawler);
        let outcome = invocation.run().await;
        assert!(outcome.is_ok());

        let report = serde_json::to_string(&invocation.report(&outcome)).unwrap();
        let captured = logs.contents();
        assert!(captured.contains("Scan job invocation succeeded"));
        assert!(!captured.contains(PASSWORD), "password leaked into logs: {captured}");
        assert!(!report.contains(PASSWORD));

        // The password only travels inside the submission itself
        let submitted = crawler.crawler("analyticsCrawler").unwrap();
        assert!(submitted.configuration_json().contains(PASSWORD));
        assert!(!format!("{submitted:?}").contains(PASSWORD));
    }
}

#[tokio::test]
async fn test_credential_absent_when_service_echoes_it() {
    let (logs, _guard) = capture(false);
    let profile = profile();
    let secrets = InMemorySecretStore::new().with_secret(&profile.secret.reference, &secret_json());
    let crawler = RecordingCrawlerService::new();
    crawler.fail_next(SubmissionError::rejected(format!(
        "InvalidInputException: PASSWORD={PASSWORD} is not accepted"
    )));

    let mut invocation = ScanJobInvocation::new(Trigger::Deploy, &profile, &secrets, &crawler);
    let outcome = invocation.run().await;

    let error = outcome.as_ref().unwrap_err();
    assert_eq!(error.kind(), "submission_rejected");
    assert!(!error.to_string().contains(PASSWORD));
    assert!(!format!("{error:?}").contains(PASSWORD));

    let report = serde_json::to_string(&invocation.report(&outcome)).unwrap();
    assert!(!report.contains(PASSWORD));

    let captured = logs.contents();
    assert!(captured.contains("Scan job invocation failed"));
    assert!(!captured.contains(PASSWORD), "password leaked into logs: {captured}");
}

#[tokio::test]
async fn test_credential_absent_when_connection_build_fails() {
    let (logs, _guard) = capture(false);
    let profile = profile();
    let secret = serde_json::json!({
        "host": "analytics.internal",
        "port": "not-a-port",
        "dbname": "analytics",
        "username": "reporter",
        "password": PASSWORD,
    })
    .to_string();
    let secrets = InMemorySecretStore::new().with_secret(&profile.secret.reference, &secret);
    let crawler = RecordingCrawlerService::new();

    let mut invocation = ScanJobInvocation::new(Trigger::Scheduled, &profile, &secrets, &crawler);
    let outcome = invocation.run().await;

    let error = outcome.as_ref().unwrap_err();
    assert_eq!(error.kind(), "connection_build_failure");
    assert_eq!(crawler.call_count(), 0);
    assert!(!logs.contents().contains(PASSWORD));
    assert!(!serde_json::to_string(&invocation.report(&outcome)).unwrap().contains(PASSWORD));
}

#[tokio::test]
async fn test_malformed_secret_error_names_fields_not_values() {
    let (logs, _guard) = capture(false);
    let profile = profile();
    let secret = serde_json::json!({
        "host": "analytics.internal",
        "password": PASSWORD,
    })
    .to_string();
    let secrets = InMemorySecretStore::new().with_secret(&profile.secret.reference, &secret);
    let crawler = RecordingCrawlerService::new();

    let mut invocation = ScanJobInvocation::new(Trigger::Scheduled, &profile, &secrets, &crawler);
    let error = invocation.run().await.unwrap_err();

    let message = error.to_string();
    assert!(message.contains("port"));
    assert!(message.contains("username"));
    assert!(!message.contains(PASSWORD));
    assert!(!logs.contents().contains(PASSWORD));
}

#[tokio::test]
async fn test_short_credential_scrubbed_from_service_diagnostics() {
    let (logs, _guard) = capture(false);
    let profile = profile();
    let secret = serde_json::json!({
        "host": "analytics.internal",
        "port": "5432",
        "dbname": "analytics",
        "username": "reporter",
        "password": "Q7",
    })
    .to_string();
    let secrets = InMemorySecretStore::new().with_secret(&profile.secret.reference, &secret);
    let crawler = RecordingCrawlerService::new();
    crawler.fail_next(SubmissionError::rejected("bad PASSWORD value Q7 rejected"));

    let mut invocation = ScanJobInvocation::new(Trigger::Scheduled, &profile, &secrets, &crawler);
    let outcome = invocation.run().await;

    let error = outcome.as_ref().unwrap_err();
    assert_eq!(error.kind(), "submission_rejected");
    assert!(!error.to_string().contains("Q7"));
    assert!(!format!("{error:?}").contains("Q7"));

    let report = serde_json::to_string(&invocation.report(&outcome)).unwrap();
    assert!(report.contains("bad PASSWORD value **** rejected"));
    assert!(!report.contains("Q7"));

    let captured = logs.contents();
    assert!(captured.contains("Scan job invocation failed"));
    assert!(!captured.contains("Q7"), "password leaked into logs: {captured}");
}

#[tokio::test]
async fn test_credential_reused_as_username_absent_from_logs() {
    let (logs, _guard) = capture(false);
    let profile = profile();
    let secret = serde_json::json!({
        "host": "analytics.internal",
        "port": "5432",
        "dbname": "analytics",
        "username": PASSWORD,
        "password": PASSWORD,
    })
    .to_string();
    let secrets = InMemorySecretStore::new().with_secret(&profile.secret.reference, &secret);
    let crawler = RecordingCrawlerService::new();

    let mut invocation = ScanJobInvocation::new(Trigger::Scheduled, &profile, &secrets, &crawler);
    assert!(invocation.run().await.is_ok());

    let captured = logs.contents();
    assert!(captured.contains("Resolved database credentials"));
    assert!(!captured.contains(PASSWORD), "password leaked into logs: {captured}");
}
