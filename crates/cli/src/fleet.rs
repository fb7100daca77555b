//! `pure1-fleet` command.

use std::io::Write;

use pure1_authn::{KeyLoader, PasswordPrompt};
use pure1_metrics::{FleetReport, FleetReporter, Pure1Client};

use crate::{
    args::{FleetArgs, OutputFormat},
    config::FileConfig,
    output::{render_json, render_text},
    token::fetch_token,
};

/// Progress line written to the status stream once authenticated.
pub const RETRIEVING_BANNER: &str = "Retrieving array information and system space from Pure1...";

/// Authenticates, then builds the fleet report described by `args`.
///
/// [`RETRIEVING_BANNER`] goes to `status` before the first API request.
///
/// # Errors
///
/// Fails on authentication errors, an inventory failure, or a metrics
/// failure under `--fail-fast`.
pub async fn build_report<P: PasswordPrompt>(
    args: &FleetArgs,
    loader: &KeyLoader<P>,
    status: &mut impl Write,
) -> anyhow::Result<FleetReport> {
    let file = FileConfig::load(args.common.config.as_deref())?;
    let client_config = file.client_config(args)?;
    let report_config = file.report_config(args)?;

    let token = fetch_token(&args.common, &file, false, loader).await?;
    let client = Pure1Client::new(client_config, token)?;

    writeln!(status, "{RETRIEVING_BANNER}")?;
    tracing::info!(base_url = %client.config().base_url(), "retrieving array information");
    let report = FleetReporter::new(client, report_config).run().await?;

    let failed = report.failed_rows().count();
    if failed > 0 {
        let total = report.rows.len();
        tracing::warn!(failed, total, "some arrays were reported without metrics");
    }
    Ok(report)
}

/// Runs `pure1-fleet`, writing the rendered report to `out` and progress
/// to `status`.
///
/// # Errors
///
/// See [`build_report`]; also fails if the output cannot be written.
pub async fn execute<P: PasswordPrompt>(
    args: &FleetArgs,
    loader: &KeyLoader<P>,
    out: &mut impl Write,
    status: &mut impl Write,
) -> anyhow::Result<()> {
    let report = build_report(args, loader, status).await?;
    match args.format {
        OutputFormat::Text => write!(out, "{}", render_text(&report))?,
        OutputFormat::Json => writeln!(out, "{}", render_json(&report)?)?,
    }
    Ok(())
}
