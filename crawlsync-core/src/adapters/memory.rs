//! In-process adapter implementations.
//!
//! Used by the test suites and by `plan` dry runs. Each adapter can be
//! scripted to fail so retry and failure paths can be exercised without a
//! live account.

use super::{CrawlerService, QueryCatalog, QueryRegistration, SecretStore};
use crate::error::{CatalogError, ResolveError, SubmissionError};
use crate::models::{CrawlerSubmission, NamedQuery, SubmissionAction, SubmissionReceipt};
use crate::resolver::SecretRef;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use zeroize::Zeroizing;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scripted secret store failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFailure {
    /// Fails with `ResolveError::NotFound`
    NotFound,
    /// Fails with `ResolveError::AccessDenied`
    AccessDenied,
    /// Fails with a retryable `ResolveError::StoreUnavailable`
    Unavailable,
}

impl StoreFailure {
    fn into_error(self, secret_ref: &SecretRef) -> ResolveError {
        let secret = secret_ref.to_string();
        match self {
            Self::NotFound => ResolveError::NotFound { secret },
            Self::AccessDenied => ResolveError::AccessDenied { secret },
            Self::Unavailable => ResolveError::unavailable(secret, "store temporarily unavailable"),
        }
    }
}

/// Secret store backed by a map.
#[derive(Default)]
pub struct InMemorySecretStore {
    secrets: Mutex<HashMap<SecretRef, Zeroizing<String>>>,
    failures: Mutex<HashMap<SecretRef, StoreFailure>>,
    transient: Mutex<VecDeque<StoreFailure>>,
    reads: AtomicUsize,
}

impl InMemorySecretStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` at `secret_ref`
    pub fn with_secret(self, secret_ref: &SecretRef, value: &str) -> Self {
        self.put(secret_ref, value);
        self
    }

    /// Makes every read of `secret_ref` fail with `failure`
    pub fn with_failure(self, secret_ref: &SecretRef, failure: StoreFailure) -> Self {
        lock(&self.failures).insert(secret_ref.clone(), failure);
        self
    }

    /// Replaces the value at `secret_ref`, as a rotation would
    pub fn put(&self, secret_ref: &SecretRef, value: &str) {
        lock(&self.secrets).insert(secret_ref.clone(), Zeroizing::new(value.to_string()));
    }

    /// Fails the next `count` reads, whatever the reference
    pub fn fail_next(&self, count: usize, failure: StoreFailure) {
        lock(&self.transient).extend(std::iter::repeat_n(failure, count));
    }

    /// Number of `get` calls served so far, including failed ones
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn get(&self, secret_ref: &SecretRef) -> Result<Zeroizing<String>, ResolveError> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        if let Some(failure) = lock(&self.transient).pop_front() {
            return Err(failure.into_error(secret_ref));
        }
        if let Some(failure) = lock(&self.failures).get(secret_ref) {
            return Err(failure.into_error(secret_ref));
        }

        lock(&self.secrets)
            .get(secret_ref)
            .cloned()
            .ok_or_else(|| ResolveError::NotFound {
                secret: secret_ref.to_string(),
            })
    }
}

/// Crawler service that keeps the latest definition of each crawler and a
/// log of every accepted submission.
#[derive(Default)]
pub struct RecordingCrawlerService {
    crawlers: Mutex<BTreeMap<String, CrawlerSubmission>>,
    submissions: Mutex<Vec<CrawlerSubmission>>,
    failures: Mutex<VecDeque<SubmissionError>>,
    calls: AtomicUsize,
    latency: Option<Duration>,
}

impl RecordingCrawlerService {
    /// Creates a service with no crawlers
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every call, for exercising caller timeouts
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Queues a failure for the next call
    pub fn fail_next(&self, error: SubmissionError) {
        lock(&self.failures).push_back(error);
    }

    /// Every accepted submission, oldest first
    pub fn submissions(&self) -> Vec<CrawlerSubmission> {
        lock(&self.submissions).clone()
    }

    /// Current definition of the named crawler
    pub fn crawler(&self, name: &str) -> Option<CrawlerSubmission> {
        lock(&self.crawlers).get(name).cloned()
    }

    /// Number of calls received, including failed ones
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CrawlerService for RecordingCrawlerService {
    async fn create_or_update(
        &self,
        submission: &CrawlerSubmission,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(error) = lock(&self.failures).pop_front() {
            return Err(error);
        }

        let mut crawlers = lock(&self.crawlers);
        let action = match crawlers.get(&submission.crawler_name) {
            Some(existing) if existing.same_content_as(submission) => SubmissionAction::Unchanged,
            Some(_) => SubmissionAction::Updated,
            None => SubmissionAction::Created,
        };

        if action != SubmissionAction::Unchanged {
            crawlers.insert(submission.crawler_name.clone(), submission.clone());
        }
        lock(&self.submissions).push(submission.clone());

        Ok(SubmissionReceipt::now(&submission.crawler_name, action))
    }
}

/// Query catalog kept in memory. Query names are unique across databases,
/// as in an Athena work group.
#[derive(Default)]
pub struct InMemoryQueryCatalog {
    databases: Mutex<BTreeSet<String>>,
    queries: Mutex<BTreeMap<String, (String, NamedQuery)>>,
    fail_databases: bool,
}

impl InMemoryQueryCatalog {
    /// Creates an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `ensure_database` call fail
    pub fn failing_databases(mut self) -> Self {
        self.fail_databases = true;
        self
    }

    /// Databases created so far, ordered by name
    pub fn databases(&self) -> Vec<String> {
        lock(&self.databases).iter().cloned().collect()
    }

    /// Queries registered against `database`, ordered by name
    pub fn queries(&self, database: &str) -> Vec<NamedQuery> {
        lock(&self.queries)
            .values()
            .filter(|(db, _)| db == database)
            .map(|(_, query)| query.clone())
            .collect()
    }
}

#[async_trait]
impl QueryCatalog for InMemoryQueryCatalog {
    async fn ensure_database(&self, name: &str, _description: &str) -> Result<bool, CatalogError> {
        if self.fail_databases {
            return Err(CatalogError::Database {
                database: name.to_string(),
                message: "catalog unavailable".to_string(),
            });
        }
        Ok(lock(&self.databases).insert(name.to_string()))
    }

    async fn register_query(
        &self,
        database: &str,
        query: &NamedQuery,
    ) -> Result<QueryRegistration, CatalogError> {
        let mut queries = lock(&self.queries);
        if queries.contains_key(&query.name) {
            return Ok(QueryRegistration::AlreadyPresent);
        }
        let id = format!("{}-{}", database, queries.len());
        queries.insert(query.name.clone(), (database.to_string(), query.clone()));
        Ok(QueryRegistration::Registered(id))
    }
}
