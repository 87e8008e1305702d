//! Deploy-time crawler configuration tool.
//!
//! This binary resolves the database secret named by the deployment
//! profile, builds the crawler configuration from it and upserts the
//! crawler, optionally provisioning the catalog database and named queries
//! around it.
//!
//! # Security Guarantees
//! - The database password is never logged or printed
//! - Service diagnostics are scrubbed before they are shown
//! - Interrupting or failing a run submits nothing partial

use anyhow::{Context, bail};
use clap::Parser;
use crawlsync::Cli;
use crawlsync::commands::{Services, execute};
use crawlsync::output::render;
use crawlsync_core::adapters::aws::AwsServices;
use crawlsync_core::{init_logging, initialize_configuration_validator};
use tracing::{error, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet, cli.global.log_format)?;
    initialize_configuration_validator()
        .context("Failed to initialize configuration validator")?;

    let profile = cli
        .load_profile()
        .await
        .with_context(|| format!("Failed to load profile {}", cli.profile.display()))?;

    let aws = AwsServices::load(profile.region.clone(), profile.timeouts.longest()).await;
    let secrets = aws.secret_store();
    let crawler = aws.crawler_service();
    let catalog = aws.query_catalog(
        profile.catalog.catalog_id.clone(),
        profile.catalog.work_group.clone(),
    );
    let services = Services {
        secrets: &secrets,
        crawler: &crawler,
        catalog: &catalog,
    };

    // Dropping the command future on Ctrl-C cancels it between service calls
    let report = tokio::select! {
        result = execute(cli.command, &profile, services) => result.map_err(|e| {
            error!(kind = e.kind(), "Command failed: {}", e);
            e
        })?,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted; no further changes will be submitted");
            bail!("interrupted");
        }
    };

    println!("{}", render(&report, cli.global.output)?);

    if let Some(failure) = report.failure() {
        bail!("{}", failure);
    }
    Ok(())
}
