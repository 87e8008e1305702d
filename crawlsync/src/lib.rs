//! Library module for the crawlsync CLI
//!
//! Argument parsing and command execution live here so they can be tested
//! against in-memory services; `main.rs` only wires in the AWS clients.

pub mod commands;
pub mod output;

use clap::{Args, Parser, Subcommand};
use crawlsync_core::config::{CRAWLER_NAME_ENV, SECRET_ARN_ENV};
use crawlsync_core::{DeploymentProfile, LogFormat, ProfileOverrides, SecretRef};
use output::OutputFormat;
use std::path::PathBuf;

/// Environment variable naming the profile file
pub const PROFILE_ENV: &str = "CRAWLSYNC_PROFILE";

/// Command line of the `crawlsync` binary
#[derive(Debug, Parser)]
#[command(name = "crawlsync")]
#[command(about = "Configure a database crawler from a stored secret")]
#[command(version)]
#[command(long_about = "
crawlsync - secret-driven crawler configuration

Reads database credentials from Secrets Manager, builds the crawler's JDBC
configuration from them and upserts the crawler under a stable name. The
scheduled function runs exactly the same steps, so both submit identical
configurations.

SECURITY:
- The database password is never logged or printed
- Service diagnostics are scrubbed before they are shown
- A failed run submits nothing and leaves the previous crawler in place

EXAMPLES:
  crawlsync --profile crawlsync.toml deploy
  crawlsync --profile crawlsync.toml plan
  SECRET_ARN=prod/db crawlsync check-secret
")]
pub struct Cli {
    /// Logging and output options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Deployment profile
    #[arg(
        short,
        long,
        global = true,
        env = PROFILE_ENV,
        default_value = "crawlsync.toml",
        help = "Path to the deployment profile (TOML)"
    )]
    pub profile: PathBuf,

    /// Secret reference override
    #[arg(
        long,
        global = true,
        env = SECRET_ARN_ENV,
        value_parser = parse_secret_ref,
        help = "Secret ARN or name, overriding the profile"
    )]
    pub secret_ref: Option<SecretRef>,

    /// Crawler name override
    #[arg(
        long,
        global = true,
        env = CRAWLER_NAME_ENV,
        help = "Crawler name, overriding the profile"
    )]
    pub crawler_name: Option<String>,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Operations against one deployment profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Provision the catalog database, configure the crawler and register
    /// the named queries
    Deploy,
    /// Resolve the secret and submit the crawler configuration only
    Configure,
    /// Show the configuration that would be submitted, password redacted
    Plan,
    /// Check that the secret resolves and yields a valid connection
    CheckSecret,
}

/// Options shared by every command.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(
        short,
        long,
        global = true,
        help = "Suppress all log output except errors"
    )]
    pub quiet: bool,

    /// Log format
    #[arg(
        long,
        global = true,
        default_value = "text",
        value_parser = parse_log_format,
        help = "Log format: text or json"
    )]
    pub log_format: LogFormat,

    /// Result format
    #[arg(
        short,
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Format of the command result on stdout"
    )]
    pub output: OutputFormat,
}

fn parse_secret_ref(value: &str) -> Result<SecretRef, String> {
    SecretRef::parse(value).map_err(|e| e.to_string())
}

fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    value.parse()
}

impl Cli {
    /// Overrides collected from flags and their environment variables.
    pub fn overrides(&self) -> ProfileOverrides {
        ProfileOverrides {
            secret_reference: self.secret_ref.clone(),
            crawler_name: self
                .crawler_name
                .clone()
                .filter(|name| !name.trim().is_empty()),
        }
    }

    /// Loads the profile file and applies the command-line overrides.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the resulting profile
    /// is invalid.
    pub async fn load_profile(&self) -> anyhow::Result<DeploymentProfile> {
        let profile = DeploymentProfile::load(&self.profile).await?;
        Ok(profile.with_overrides(&self.overrides())?)
    }
}
