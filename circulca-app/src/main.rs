use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod config;
mod workflow;

#[derive(Parser, Debug)]
#[command(
    name = "circulca",
    version,
    about = "Compare linear and circular life-cycle scenarios for a material inventory"
)]
struct Cli {
    /// Application config file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate an inventory CSV and report missing values
    Check { input: PathBuf },

    /// Fill missing values through the service and write the merged CSV
    Impute {
        input: PathBuf,
        #[arg(short, long)]
        project: PathBuf,
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Run the linear vs. circular comparison
    Simulate {
        input: PathBuf,
        #[arg(short, long)]
        project: PathBuf,
        /// Impute missing values before simulating
        #[arg(long)]
        impute: bool,
        /// Request a report document after the run
        #[arg(long)]
        report: bool,
    },

    /// Show or replace the company's default parameters
    Defaults {
        #[command(subcommand)]
        action: DefaultsAction,
    },
}

#[derive(Subcommand, Debug)]
enum DefaultsAction {
    Show,
    Set { file: PathBuf },
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    let config = config::AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Check { input } => workflow::check(&input),
        Command::Impute { input, project, out } => {
            workflow::impute(&config, &input, &project, &out).await
        }
        Command::Simulate {
            input,
            project,
            impute,
            report,
        } => workflow::simulate(&config, &input, &project, impute, report).await,
        Command::Defaults { action } => match action {
            DefaultsAction::Show => workflow::show_defaults(&config),
            DefaultsAction::Set { file } => workflow::set_defaults(&config, &file),
        },
    }
}
