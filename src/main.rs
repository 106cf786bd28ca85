use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;
use stocktracker::commands::{fetch_data, signals, simulate, summary};
use stocktracker::config::Settings;

#[derive(Parser)]
#[command(name = "stocktracker")]
#[command(about = "Moving-average crossover signals and portfolio simulation on cached daily data")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch real-time quotes and daily history for the configured symbols
    FetchData {
        /// Comma separated symbols (defaults to the configured list)
        #[arg(long, value_name = "SYMBOLS")]
        symbols: Option<String>,
    },
    /// Print moving-average crossover signals per symbol
    Signals {
        /// Comma separated symbols (defaults to the configured list)
        #[arg(long, value_name = "SYMBOLS")]
        symbols: Option<String>,
    },
    /// Replay crossover signals against cached history for a portfolio
    Simulate {
        /// Holdings as SYMBOL:SHARES pairs, e.g. AAPL:10,MSFT:5
        #[arg(long, value_name = "HOLDINGS")]
        portfolio: String,
        /// Starting capital for each symbol's batch (defaults to the configured value)
        #[arg(long, value_name = "AMOUNT")]
        capital: Option<f64>,
    },
    /// Show per-symbol and portfolio gain/loss for current holdings
    Summary {
        /// Holdings as SYMBOL:SHARES pairs, e.g. AAPL:10,MSFT:5
        #[arg(long, value_name = "HOLDINGS")]
        portfolio: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::from_env()?;
    info!("Starting stocktracker. Simulated trades only, not financial advice.");

    match cli.command {
        Commands::FetchData { symbols } => {
            fetch_data::run(&settings, symbols.as_deref()).await?;
        }
        Commands::Signals { symbols } => {
            signals::run(&settings, symbols.as_deref()).await?;
        }
        Commands::Simulate { portfolio, capital } => {
            simulate::run(&settings, &portfolio, capital).await?;
        }
        Commands::Summary { portfolio } => {
            summary::run(&settings, &portfolio).await?;
        }
    }

    Ok(())
}
