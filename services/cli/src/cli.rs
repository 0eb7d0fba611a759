use crate::demo::{run_demo, run_expiring, run_report, DemoArgs, ExpiringArgs, ReportArgs};
use clap::{Parser, Subcommand};
use license_issuance::config::AppConfig;
use license_issuance::error::AppError;
use license_issuance::telemetry;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(
    name = "license-issuance",
    about = "Drive the license application lifecycle from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Walk through submission, approval, denial, and expiry on a built-in catalogue (default)
    Demo(DemoArgs),
    /// Print application, revenue, and license reports for a JSON fixture
    Report(ReportArgs),
    /// List licenses from a JSON fixture that expire within the notice window
    Expiring(ExpiringArgs),
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    debug!(environment = ?config.environment, "configuration loaded");

    let command = cli
        .command
        .unwrap_or_else(|| Command::Demo(DemoArgs::default()));

    match command {
        Command::Demo(args) => run_demo(args, &config.licensing).await,
        Command::Report(args) => run_report(args, &config.licensing).await,
        Command::Expiring(args) => run_expiring(args, &config.licensing).await,
    }
}
