//! Deployment configuration.
//!
//! # Module Structure
//! - `profile`: `DeploymentProfile` loaded from TOML, plus per-call-site overrides
//! - `retry`: Retry policy and per-step timeouts

mod profile;
mod retry;

pub use profile::{
    CRAWLER_NAME_ENV, CatalogSettings, CrawlerSettings, DeploymentProfile, ProfileOverrides,
    SECRET_ARN_ENV, SecretSettings,
};
pub use retry::{RetryConfig, TimeoutConfig};
