//! Rendering of command results for stdout.
//!
//! Reports never hold the password, so rendering needs no scrubbing.

use crate::commands::{CommandReport, PlanPreview, SecretSummary};
use clap::ValueEnum;
use crawlsync_core::{Deployment, InvocationReport};
use std::fmt::Write as _;

/// Format of the command result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Readable key/value lines
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

/// Renders a report in the requested format.
///
/// # Errors
/// Returns an error if JSON serialization fails.
pub fn render(report: &CommandReport, format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(report),
        OutputFormat::Text => Ok(render_text(report)),
    }
}

fn render_text(report: &CommandReport) -> String {
    match report {
        CommandReport::Deployment(deployment) => deployment_text(deployment),
        CommandReport::Invocation(invocation) => invocation_text(invocation),
        CommandReport::Plan(plan) => plan_text(plan),
        CommandReport::Secret(summary) => secret_text(summary),
    }
}

fn deployment_text(deployment: &Deployment) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "GlueDatabaseOutput: {}", deployment.outputs.glue_database);
    let _ = writeln!(out, "GlueCrawlerOutput: {}", deployment.outputs.glue_crawler);
    let _ = writeln!(
        out,
        "Catalog database: {}",
        if deployment.database_created {
            "created"
        } else {
            "already present"
        }
    );
    out.push_str(&invocation_text(&deployment.invocation));
    for query in &deployment.queries {
        match &query.query_id {
            Some(id) => {
                let _ = writeln!(out, "Named query {}: registered ({})", query.name, id);
            }
            None => {
                let _ = writeln!(out, "Named query {}: already present", query.name);
            }
        }
    }
    out
}

fn invocation_text(report: &InvocationReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Invocation: {} ({})", report.invocation_id, report.trigger);
    let _ = writeln!(out, "Crawler: {}", report.crawler_name);
    let _ = writeln!(out, "State: {}", report.state);
    if let Some(receipt) = &report.receipt {
        let _ = writeln!(
            out,
            "Submission: {} at {}",
            receipt.action,
            receipt.submitted_at.to_rfc3339()
        );
    }
    if let Some(error) = &report.error {
        let _ = writeln!(out, "Error: {}", error);
        if report.retryable == Some(true) {
            let _ = writeln!(out, "The failure is transient; running again may succeed");
        }
    }
    out
}

fn plan_text(plan: &PlanPreview) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Crawler: {}", plan.crawler_name);
    let _ = writeln!(out, "Role: {}", plan.role);
    let _ = writeln!(out, "Catalog database: {}", plan.database_name);
    for target in &plan.targets {
        let _ = writeln!(out, "Target: {} {}", target.connection_name, target.path);
    }
    let configuration =
        serde_json::to_string_pretty(&plan.configuration).unwrap_or_else(|_| "{}".to_string());
    let _ = writeln!(out, "Configuration:\n{}", configuration);
    out
}

fn secret_text(summary: &SecretSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Secret: {}", summary.secret);
    let _ = writeln!(out, "Host: {}", summary.host);
    let _ = writeln!(out, "Port: {}", summary.port);
    let _ = writeln!(out, "Database: {}", summary.dbname);
    let _ = writeln!(out, "Username: {}", summary.username);
    let _ = writeln!(
        out,
        "Password: {}",
        if summary.password_present {
            "present"
        } else {
            "missing"
        }
    );
    let _ = writeln!(out, "Connection URL: {}", summary.connection_url);
    out
}
