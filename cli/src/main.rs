use clap::{Parser, Subcommand};

mod commands;
mod util;

use commands::{agent, health, listings, market, risk, sentiment};

#[derive(Parser)]
#[command(name = "hearth", version, about = "Hearth CLI — real-estate agent analytics from the command line")]
struct Cli {
    /// API base URL
    #[arg(long, env = "HEARTH_API_URL", default_value = "http://localhost:8080")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API health
    Health,
    /// Agent profiles, search, and recommendations
    Agent {
        #[command(subcommand)]
        command: agent::AgentCommands,
    },
    /// Classify review texts by sentiment
    Sentiment {
        /// Review text to classify (repeatable)
        #[arg(long = "review", required = true)]
        reviews: Vec<String>,
    },
    /// Risk areas for a region
    Risk {
        /// Region to query (e.g. "austin-tx")
        #[arg(long)]
        region: String,
        /// Drop areas below this severity: low, moderate, high, severe
        #[arg(long)]
        min_severity: Option<String>,
    },
    /// Market statistics from the warehouse
    Market {
        #[command(subcommand)]
        command: market::MarketCommands,
    },
    /// Property listings
    Listings {
        #[command(subcommand)]
        command: listings::ListingsCommands,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Health => health::run(&cli.api_url).await,
        Commands::Agent { command } => agent::run(&cli.api_url, command).await,
        Commands::Sentiment { reviews } => sentiment::run(&cli.api_url, reviews).await,
        Commands::Risk {
            region,
            min_severity,
        } => risk::run(&cli.api_url, region, min_severity).await,
        Commands::Market { command } => market::run(&cli.api_url, command).await,
        Commands::Listings { command } => listings::run(&cli.api_url, command).await,
    };

    std::process::exit(code);
}
