use crate::commands::{
    run_dashboard, run_deadlines, run_export, run_fulfilled_bundle, run_import, run_request_bundle,
    BundleArgs, DashboardArgs, DeadlineArgs, FulfilledBundleArgs, TransferArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use evidence_desk::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Evidence Desk",
    about = "Track audit evidence, watch request deadlines, and export evidence bundles",
    version
)]
struct Cli {
    /// Use this state file instead of EVIDENCE_STATE_PATH
    #[arg(long, global = true)]
    state: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print the deadline board with approaching and overdue counts
    Deadlines(DeadlineArgs),
    /// Print evidence and request totals
    Dashboard(DashboardArgs),
    /// Download linked evidence into a bundle archive
    Bundle {
        #[command(subcommand)]
        command: BundleCommand,
    },
    /// Replace the desk state with an exported JSON document
    Import(TransferArgs),
    /// Write the desk state as a JSON document
    Export(TransferArgs),
}

#[derive(Subcommand, Debug)]
enum BundleCommand {
    /// Bundle the evidence linked to one request
    Request(BundleArgs),
    /// Bundle the evidence of every fulfilled request
    Fulfilled(FulfilledBundleArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let state = cli.state;
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args, state).await,
        Command::Deadlines(args) => run_deadlines(args, state),
        Command::Dashboard(args) => run_dashboard(args, state),
        Command::Bundle {
            command: BundleCommand::Request(args),
        } => run_request_bundle(args, state).await,
        Command::Bundle {
            command: BundleCommand::Fulfilled(args),
        } => run_fulfilled_bundle(args, state).await,
        Command::Import(args) => run_import(args, state),
        Command::Export(args) => run_export(args, state),
    }
}
