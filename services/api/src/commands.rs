use crate::infra::{open_desk, FileBackedDesk};
use chrono::{Local, NaiveDate};
use clap::Args;
use evidence_desk::config::AppConfig;
use evidence_desk::error::AppError;
use evidence_desk::telemetry::{self, LogTarget};
use evidence_desk::workflows::evidence::{
    ChannelView, DashboardSummary, DeadlineOverview, EvidenceBundle,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DeadlineArgs {
    /// Evaluation date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Alert window in days for this run only
    #[arg(long)]
    pub(crate) threshold: Option<u32>,
    /// Print the board as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DashboardArgs {
    /// Evaluation date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub(crate) struct BundleArgs {
    /// Request id, e.g. PRM-001
    pub(crate) request_id: String,
    /// Directory the archive is written to
    #[arg(long, default_value = ".")]
    pub(crate) out_dir: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct FulfilledBundleArgs {
    /// Date stamped into the archive name (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Directory the archive is written to
    #[arg(long, default_value = ".")]
    pub(crate) out_dir: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct TransferArgs {
    /// JSON document path
    pub(crate) file: PathBuf,
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

fn prepare(state: Option<PathBuf>) -> Result<Arc<FileBackedDesk>, AppError> {
    let config = AppConfig::load()?;
    telemetry::init_for(&config.telemetry, LogTarget::Stderr)?;
    open_desk(&config, state)
}

pub(crate) fn run_deadlines(args: DeadlineArgs, state: Option<PathBuf>) -> Result<(), AppError> {
    let desk = prepare(state)?;
    let today = args.today.unwrap_or_else(local_today);
    let overview = desk.deadlines(today, args.threshold)?;

    if args.json {
        println!("{}", deadlines_json(&overview)?);
        return Ok(());
    }

    render_deadlines(&overview);
    Ok(())
}

fn deadlines_json(overview: &DeadlineOverview) -> Result<String, AppError> {
    let json = serde_json::to_string_pretty(overview).map_err(std::io::Error::from)?;
    Ok(json)
}

fn channel_cell(view: &ChannelView) -> String {
    if view.raw.trim().is_empty() {
        return "-".to_string();
    }
    format!("{} ({})", view.raw.trim(), view.label)
}

fn render_deadlines(overview: &DeadlineOverview) {
    println!(
        "Deadline board for {} (alert window {} days)",
        overview.today, overview.threshold
    );
    println!(
        "- {} approaching | {} overdue",
        overview.summary.approaching, overview.summary.overdue
    );

    if overview.requests.is_empty() {
        println!("No requests on file.");
        return;
    }

    for view in &overview.requests {
        println!(
            "  {} [{}] {} | {}: {} | {}: {} | {}",
            view.request_id,
            view.status_label,
            view.description,
            view.primary.channel.label(),
            channel_cell(&view.primary),
            view.compact.channel.label(),
            channel_cell(&view.compact),
            view.primary.proximity.label()
        );
    }
}

pub(crate) fn run_dashboard(args: DashboardArgs, state: Option<PathBuf>) -> Result<(), AppError> {
    let desk = prepare(state)?;
    let summary = desk.dashboard(args.today.unwrap_or_else(local_today))?;
    render_dashboard(&summary);
    Ok(())
}

fn render_dashboard(summary: &DashboardSummary) {
    println!("Evidence desk dashboard");
    println!(
        "- {} evidence items | {} requests | alert window {} days",
        summary.total_evidence, summary.total_requests, summary.threshold
    );
    println!(
        "- {} approaching | {} overdue",
        summary.deadlines.approaching, summary.deadlines.overdue
    );

    println!("Evidence by validity:");
    for entry in &summary.evidence_by_validity {
        println!("  - {}: {}", entry.validity_label, entry.count);
    }
    if !summary.evidence_by_category.is_empty() {
        println!("Evidence by category:");
        for entry in &summary.evidence_by_category {
            println!("  - {}: {}", entry.category, entry.count);
        }
    }
    println!("Requests by status:");
    for entry in &summary.requests_by_status {
        println!("  - {}: {}", entry.status_label, entry.count);
    }
}

pub(crate) async fn run_request_bundle(
    args: BundleArgs,
    state: Option<PathBuf>,
) -> Result<(), AppError> {
    let desk = prepare(state)?;
    let bundle = desk.export_request_bundle(&args.request_id).await?;
    write_bundle(&args.out_dir, &bundle).await
}

pub(crate) async fn run_fulfilled_bundle(
    args: FulfilledBundleArgs,
    state: Option<PathBuf>,
) -> Result<(), AppError> {
    let desk = prepare(state)?;
    let today = args.today.unwrap_or_else(local_today);
    let bundle = desk.export_fulfilled_bundle(today).await?;
    write_bundle(&args.out_dir, &bundle).await
}

async fn write_bundle(out_dir: &Path, bundle: &EvidenceBundle) -> Result<(), AppError> {
    tokio::fs::create_dir_all(out_dir).await?;
    let path = out_dir.join(&bundle.file_name);
    tokio::fs::write(&path, &bundle.bytes).await?;

    println!(
        "Wrote {} ({} files, {} manifest rows)",
        path.display(),
        bundle.files.len(),
        bundle.manifest_rows
    );
    if bundle.failure_count() > 0 {
        println!("{} items could not be bundled:", bundle.failure_count());
        for line in bundle.failure_lines() {
            println!("  - {line}");
        }
    }
    Ok(())
}

pub(crate) fn run_import(args: TransferArgs, state: Option<PathBuf>) -> Result<(), AppError> {
    let desk = prepare(state)?;
    let raw = std::fs::read_to_string(&args.file)?;
    let summary = desk.import_state(&raw)?;
    println!(
        "Imported {} evidence items and {} requests (alert window {} days)",
        summary.evidence, summary.requests, summary.threshold
    );
    Ok(())
}

pub(crate) fn run_export(args: TransferArgs, state: Option<PathBuf>) -> Result<(), AppError> {
    let desk = prepare(state)?;
    let snapshot = desk.export_state()?;
    let encoded = serde_json::to_vec_pretty(&snapshot).map_err(std::io::Error::from)?;
    std::fs::write(&args.file, encoded)?;
    println!(
        "Exported {} evidence items and {} requests to {}",
        snapshot.evidence.len(),
        snapshot.requests.len(),
        args.file.display()
    );
    Ok(())
}
