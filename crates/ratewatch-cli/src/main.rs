mod prices;
mod scheduler;
mod sink;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::prices::RunArgs;

#[derive(Debug, Parser)]
#[command(name = "ratewatch", about = "Collect nightly hotel price snapshots")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Price collection runs
    Prices {
        #[command(subcommand)]
        command: PricesCommands,
    },
    /// Run the two daily collection slots until interrupted
    Schedule,
}

#[derive(Debug, Subcommand)]
enum PricesCommands {
    /// Collect snapshots for the hotels in the registry
    Run(RunArgs),
    /// Collect snapshots for a single listing URL
    Url {
        url: String,
        /// Number of check-in dates, starting tomorrow
        #[arg(long)]
        dates: Option<usize>,
    },
    /// Build snapshots from a saved availability payload
    Payload {
        file: PathBuf,
        #[arg(long)]
        hotel_id: String,
        /// Number of check-in dates, starting tomorrow
        #[arg(long, conflicts_with = "j_plus")]
        dates: Option<usize>,
        /// Only the check-in date N days from today
        #[arg(long = "j-plus")]
        j_plus: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = ratewatch_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let Some(command) = cli.command else {
        println!("ratewatch: no command given; try --help");
        return Ok(ExitCode::SUCCESS);
    };

    let success = match command {
        Commands::Prices { command } => match command {
            PricesCommands::Run(args) => {
                let outcome = prices::run(&config, &args).await;
                outcome.print_summary();
                outcome.success
            }
            PricesCommands::Url { url, dates } => prices::run_url(&config, &url, dates).await?,
            PricesCommands::Payload {
                file,
                hotel_id,
                dates,
                j_plus,
            } => prices::run_payload(&config, &file, &hotel_id, dates, j_plus)?,
        },
        Commands::Schedule => {
            scheduler::run_until_shutdown(config).await?;
            true
        }
    };

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
