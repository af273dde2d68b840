use anyhow::Result;
use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use stockpick::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for stockpick::AppCommand {
    fn from(cmd: Commands) -> stockpick::AppCommand {
        match cmd {
            Commands::Price { ticker, date, json } => {
                stockpick::AppCommand::Price { ticker, date, json }
            }
            Commands::EntryPrice { ticker } => stockpick::AppCommand::EntryPrice { ticker },
            Commands::Portfolio { participant } => {
                stockpick::AppCommand::Portfolio { participant }
            }
            Commands::Leaderboard { watch, participant } => {
                stockpick::AppCommand::Leaderboard { watch, participant }
            }
            Commands::Logo { ticker, out } => stockpick::AppCommand::Logo { ticker, out },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Resolve a price for the competition's provider
    Price {
        ticker: String,
        /// Use the latest close on or before this date (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<NaiveDate>,
        /// Print the JSON price payload
        #[arg(long)]
        json: bool,
    },
    /// Preview the entry price and share count a new pick would record
    EntryPrice { ticker: String },
    /// Value one participant's picks at current prices
    Portfolio { participant: String },
    /// Rank every participant by percentage return
    Leaderboard {
        /// Keep refreshing at the competition's refresh interval
        #[arg(short, long)]
        watch: bool,
        /// Participant to highlight with their rank
        #[arg(short, long)]
        participant: Option<String>,
    },
    /// Save a ticker logo to a file
    Logo {
        ticker: String,
        #[arg(short, long)]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; keys may already be in the environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => stockpick::cli::setup::setup_at_path(path),
            None => stockpick::cli::setup::setup(),
        },
        Some(cmd) => stockpick::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
