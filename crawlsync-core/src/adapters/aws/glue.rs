//! Glue crawler service.

use super::{CallFailure, classify, describe};
use crate::adapters::CrawlerService;
use crate::error::SubmissionError;
use crate::models::{CrawlerSubmission, ScanTarget, SubmissionAction, SubmissionReceipt};
use async_trait::async_trait;
use aws_sdk_glue::Client;
use aws_sdk_glue::types::{Crawler, CrawlerTargets, JdbcTarget};
use tracing::{debug, info};

const ENTITY_NOT_FOUND: &str = "EntityNotFoundException";
const ALREADY_EXISTS: &str = "AlreadyExistsException";

/// Creates or updates Glue crawlers keyed by name.
///
/// The existing definition is read first; an identical definition is left
/// untouched so repeated runs do not bump the crawler's version.
#[derive(Debug, Clone)]
pub struct GlueCrawlerService {
    client: Client,
}

impl GlueCrawlerService {
    /// Creates the adapter
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn existing(&self, name: &str) -> Result<Option<Crawler>, SubmissionError> {
        match self.client.get_crawler().name(name).send().await {
            Ok(output) => Ok(output.crawler().cloned()),
            Err(e) => match classify(&e) {
                CallFailure::Service(code) if code == ENTITY_NOT_FOUND => Ok(None),
                failure => Err(to_submission_error(failure, describe(&e))),
            },
        }
    }

    /// Returns `false` if a crawler of that name appeared since it was read.
    async fn create(&self, submission: &CrawlerSubmission) -> Result<bool, SubmissionError> {
        let result = self
            .client
            .create_crawler()
            .name(&submission.crawler_name)
            .role(&submission.role)
            .database_name(&submission.database_name)
            .targets(crawler_targets(&submission.targets))
            .configuration(submission.configuration_json())
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) => match classify(&e) {
                CallFailure::Service(code) if code == ALREADY_EXISTS => Ok(false),
                failure => Err(to_submission_error(failure, describe(&e))),
            },
        }
    }

    async fn update(&self, submission: &CrawlerSubmission) -> Result<(), SubmissionError> {
        self.client
            .update_crawler()
            .name(&submission.crawler_name)
            .role(&submission.role)
            .database_name(&submission.database_name)
            .targets(crawler_targets(&submission.targets))
            .configuration(submission.configuration_json())
            .send()
            .await
            .map(|_| ())
            .map_err(|e| to_submission_error(classify(&e), describe(&e)))
    }
}

fn crawler_targets(targets: &[ScanTarget]) -> CrawlerTargets {
    let jdbc_targets = targets
        .iter()
        .map(|target| {
            JdbcTarget::builder()
                .connection_name(&target.connection_name)
                .path(&target.path)
                .build()
        })
        .collect();

    CrawlerTargets::builder()
        .set_jdbc_targets(Some(jdbc_targets))
        .build()
}

fn matches_existing(existing: &Crawler, submission: &CrawlerSubmission) -> bool {
    let existing_targets: Vec<(Option<&str>, Option<&str>)> = existing
        .targets()
        .map(|targets| {
            targets
                .jdbc_targets()
                .iter()
                .map(|t| (t.connection_name(), t.path()))
                .collect()
        })
        .unwrap_or_default();
    let wanted_targets: Vec<(Option<&str>, Option<&str>)> = submission
        .targets
        .iter()
        .map(|t| (Some(t.connection_name.as_str()), Some(t.path.as_str())))
        .collect();

    existing.role() == Some(submission.role.as_str())
        && existing.database_name() == Some(submission.database_name.as_str())
        && existing.configuration() == Some(submission.configuration_json())
        && existing_targets == wanted_targets
}

/// Maps a Glue failure onto the submission error shape.
///
/// Concurrent modifications and a running crawler are conflicts that clear
/// on their own, so they are flagged for retry.
fn to_submission_error(failure: CallFailure, detail: String) -> SubmissionError {
    match failure {
        CallFailure::Service(code) => match code.as_str() {
            "ConcurrentModificationException"
            | "CrawlerRunningException"
            | "VersionMismatchException" => SubmissionError::conflict(code),
            "OperationTimeoutException" => SubmissionError::timeout(code),
            _ => SubmissionError::rejected(detail),
        },
        CallFailure::Timeout => SubmissionError::timeout("request timed out"),
        CallFailure::Transport => SubmissionError::timeout(detail),
    }
}

#[async_trait]
impl CrawlerService for GlueCrawlerService {
    async fn create_or_update(
        &self,
        submission: &CrawlerSubmission,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let name = &submission.crawler_name;
        debug!(crawler = %name, "Reading existing crawler definition");

        let action = match self.existing(name).await? {
            Some(existing) if matches_existing(&existing, submission) => {
                SubmissionAction::Unchanged
            }
            Some(_) => {
                self.update(submission).await?;
                SubmissionAction::Updated
            }
            None => {
                if self.create(submission).await? {
                    SubmissionAction::Created
                } else {
                    // Lost a race with a concurrent create
                    self.update(submission).await?;
                    SubmissionAction::Updated
                }
            }
        };

        info!(crawler = %name, action = %action, "Crawler definition submitted");
        Ok(SubmissionReceipt::now(name, action))
    }
}
