use clap::{Parser, Subcommand};

use crate::commands;
use crate::constants::DEFAULT_PORT;

#[derive(Parser)]
#[command(name = "tickerboard")]
#[command(about = "Stock price dashboard backend", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the server with background refresh workers
    Serve {
        /// HTTP port to listen on
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    /// One-shot history + quote pull for the watchlist
    Pull {
        /// Trailing days of daily history to backfill
        #[arg(short, long, default_value_t = 365)]
        days: i64,
    },
    /// Show store record counts and latest prices
    Status,
}

pub async fn run() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => {
            commands::serve::run(port).await;
        }
        Commands::Pull { days } => {
            commands::pull::run(days).await;
        }
        Commands::Status => {
            commands::status::run().await;
        }
    }
}
