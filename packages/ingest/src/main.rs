#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the DVF ingestion pipeline.

use clap::{Parser, Subcommand};
use immo_map_database::{db, run_migrations};
use immo_map_ingest::{IngestOptions, run_ingestion};

#[derive(Parser)]
#[command(name = "immo_map_ingest", about = "DVF data ingestion tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the DVF extracts and replace the transactions table
    Run {
        /// Comma-separated department codes (default: all of Île-de-France)
        #[arg(long)]
        departements: Option<String>,
        /// Maximum number of kept rows per department (for testing)
        #[arg(long)]
        limit: Option<u64>,
    },
    /// Run database migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let cli = Cli::parse();

    let db = db::connect_from_env().await?;
    run_migrations(db.as_ref()).await?;

    match cli.command {
        Commands::Run {
            departements,
            limit,
        } => {
            let options = IngestOptions {
                departments: departements
                    .map(|s| s.split(',').map(|d| d.trim().to_string()).collect())
                    .unwrap_or_default(),
                limit,
            };

            let inserted = run_ingestion(db.as_ref(), &options).await?;
            println!("Inserted {inserted} rows");
        }
        Commands::Migrate => {
            println!("Migrations applied");
        }
    }

    Ok(())
}
