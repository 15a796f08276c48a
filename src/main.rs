//! Command-line front end for seedstore

use std::path::PathBuf;
use std::sync::Arc;
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;
use seedstore::control::{Command, Controller};
use seedstore::core::config::Config;
use seedstore::core::error::Result;
use seedstore::generation::data::{AlphanumericGenerator, DataGenerator};
use seedstore::search::request::SearchParams;
use seedstore::storage::store::Store;

#[derive(Parser)]
#[command(name = "seedstore")]
#[command(about = "Bulk record generation and prefix search over a local store", long_about = None)]
struct Cli {
    /// JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Storage directory, overrides the config file
    #[arg(short, long, global = true)]
    path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clear the store and fill it with random records, printing progress events
    Generate {
        /// Number of records to write
        #[arg(short, long)]
        records: Option<u64>,

        /// Records per batch
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Length of each record's data
        #[arg(short, long)]
        symbols: Option<usize>,

        /// Seed for reproducible data
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Prefix search with offset/limit paging
    Search {
        /// Prefix to match; empty matches everything
        #[arg(short, long, default_value = "")]
        query: String,

        #[arg(short, long)]
        offset: Option<String>,

        #[arg(short, long)]
        limit: Option<String>,
    },

    /// Show store statistics
    Stats,

    /// Snapshot the collection and truncate the log
    Compact,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(path) = &cli.path {
        config.storage_path = path.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = load_config(&cli)?;

    match cli.command {
        Commands::Generate { records, batch_size, symbols, seed } => {
            if let Some(records) = records {
                config.quantity_records = records;
            }
            if let Some(batch_size) = batch_size {
                config.batch_size = batch_size;
            }
            if let Some(symbols) = symbols {
                config.quantity_symbols = symbols;
            }

            let generator: Arc<dyn DataGenerator> = match seed {
                Some(seed) => Arc::new(AlphanumericGenerator::seeded(seed)),
                None => Arc::new(AlphanumericGenerator::new()),
            };
            let controller = Controller::with_generator(config, generator)?;
            let mut events = controller.subscribe();

            let run = controller.handle_command(Command::GenerateRecords).await?;
            loop {
                match events.recv().await {
                    Ok(event) => {
                        println!("{}", serde_json::to_string(&event)?);
                        if event.is_terminal() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
            run.await??;
        }

        Commands::Search { query, offset, limit } => {
            let controller = Controller::new(config)?;
            let params = SearchParams {
                search_query: Some(query),
                offset,
                limit,
            };
            let page = controller.handle_search(&params).await?;
            println!("{}", serde_json::to_string(&page)?);
        }

        Commands::Stats => {
            let store = Store::open(&config)?;
            println!("{}", serde_json::to_string_pretty(&store.stats())?);
        }

        Commands::Compact => {
            let store = Store::open(&config)?;
            store.compact()?;
            println!("{}", serde_json::to_string_pretty(&store.stats())?);
        }
    }

    Ok(())
}
