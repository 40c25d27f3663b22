use crate::demo::{run_assess, run_simulate, AssessArgs, SimulateArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use credit_risk::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Credit Risk Assessor",
    about = "Run the credit-risk assessment service or query the risk model from the command line",
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
    /// Submit one applicant profile for a full, explained assessment
    Assess(AssessArgs),
    /// Assess a profile, then replay slider edits through the what-if simulation
    Simulate(SimulateArgs),
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
        Command::Assess(args) => run_assess(args).await,
        Command::Simulate(args) => run_simulate(args).await,
    }
}
