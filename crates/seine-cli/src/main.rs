//! Seine - polite, resumable, domain-scoped site harvester.
//!
//! Three subcommands: `crawl` runs the engine to completion (resuming any
//! interrupted frontier), `export` dumps the store to JSONL/JSON files,
//! and `validate` checks a config file and exits.

use anyhow::Result;
use clap::{Parser, Subcommand};
use seine_config::CrawlerConfig;
use seine_spider::CrawlEngine;
use seine_store::Store;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "seine")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Polite, resumable, domain-scoped site harvester", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the crawl to completion
    ///
    /// Seeds the frontier if empty, resumes any pending work, and drains
    /// the queue. Ctrl-C finishes the in-flight URL and exits cleanly.
    Crawl,

    /// Dump store tables to newline-delimited records
    ///
    /// Writes documents/faq_items/link_edges/assets as JSONL plus JSON
    /// arrays for the external URL and domain registries.
    Export,

    /// Parse and validate the configuration, then exit
    Validate,
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    if let Err(error) = run(cli).await {
        eprintln!("Error: {error:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Crawl => {
            let config = CrawlerConfig::from_file(&cli.config)?;
            config.validate()?;
            let store = Arc::new(Store::open(&config.db_path)?);

            let cancel = CancellationToken::new();
            let signal_token = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupt received, finishing the in-flight URL");
                    signal_token.cancel();
                }
            });

            let engine = CrawlEngine::new(&config, store.clone(), cancel)?;
            engine.run().await?;

            let counts = store.queue_counts().await?;
            info!(?counts, "crawl finished");
            for (status, count) in counts {
                println!("{status}: {count}");
            }
        }
        Commands::Export => {
            let config = CrawlerConfig::from_file(&cli.config)?;
            let store = Store::open(&config.db_path)?;
            store.export_all(&config.output_directories.json).await?;
            println!("exported to {}", config.output_directories.json.display());
        }
        Commands::Validate => {
            let config = CrawlerConfig::from_file(&cli.config)?;
            config.validate()?;
            println!("configuration OK");
        }
    }
    Ok(())
}
