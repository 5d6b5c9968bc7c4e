use crate::commands::{
    run_copy_forward, run_readiness_report, run_rotation, run_table_export, CopyForwardArgs,
    ReportArgs, RotationArgs, TableArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use roster_readiness::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Roster Readiness",
    about = "Attendance compliance, rotation and safety escalation for a driving unit",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print a readiness report for a roster snapshot
    Report(ReportArgs),
    /// Export the comprehensive attendance table as CSV
    Table(TableArgs),
    /// Show which rotation groups report during a given week
    Rotation(RotationArgs),
    /// Refill an event's expected soldiers from the matching earlier event
    CopyForward(CopyForwardArgs),
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
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Report(args) => run_readiness_report(args),
        Command::Table(args) => run_table_export(args),
        Command::Rotation(args) => run_rotation(args),
        Command::CopyForward(args) => run_copy_forward(args),
    }
}
