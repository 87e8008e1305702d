//! Core types and services for crawlsync.
//!
//! This crate resolves database credentials from a secret store, builds a
//! crawler's JDBC configuration from them and submits it to the crawler
//! service. The deploy CLI and the scheduled function both drive the same
//! [`pipeline::ScanJobInvocation`], so they submit identical configurations.
//!
//! # Security Guarantees
//! - The database password lives in zeroizing containers and is redacted
//!   from every `Debug` implementation
//! - No error, log event or report carries the password; service
//!   diagnostics are scrubbed before they leave the core
//! - Secrets are read fresh for every invocation and never cached
//!
//! # Architecture
//! - `resolver`: credential resolution over the `SecretStore` trait
//! - `configurator`: connection building, payload validation, submission
//! - `pipeline`: state machine with retries, timeouts and reporting
//! - `adapters`: in-memory and AWS implementations of the service traits

pub mod adapters;
pub mod catalog;
pub mod config;
pub mod configurator;
pub mod error;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod resolver;
pub mod retry;
pub mod security;
pub mod validation;

// Re-export commonly used types
pub use adapters::{CrawlerService, QueryCatalog, QueryRegistration, SecretStore};
pub use config::{DeploymentProfile, ProfileOverrides, RetryConfig, TimeoutConfig};
pub use configurator::{ScanJob, ScanJobConfigurator};
pub use error::{
    CatalogError, ConfigureError, CrawlSyncError, ProfileError, ResolveError, Result,
    SubmissionError,
};
pub use logging::{LogFormat, init_logging};
pub use models::{
    CrawlerConfig, CrawlerSubmission, DatabaseProtocol, NamedQuery, ProvisioningOutputs,
    ScanTarget, SchemaHint, SchemaHints, SubmissionAction, SubmissionReceipt,
};
pub use pipeline::{
    Deployment, InvocationReport, InvocationState, ScanJobInvocation, Trigger, provision,
    resolve_for_profile,
};
pub use resolver::{CredentialResolver, SecretRef};
pub use security::{Redactor, SecretRecord};

pub use validation::{ValidationError, initialize_configuration_validator, validate_configuration};
