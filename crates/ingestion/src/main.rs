//! PaperPulse Ingestion CLI
//!
//! - `ingestion run`      fetch the feed once and store the results
//! - `ingestion migrate`  apply pending schema migrations
//! - `ingestion parse`    parse a saved feed document and print the records

use anyhow::Context;
use clap::{Parser, Subcommand};
use paperpulse_common::{
    config::AppConfig,
    db::{DbPool, MemoryStore, PaperStore, Repository},
    VERSION,
};
use paperpulse_ingestion::{
    ArxivClient, FeedClient, FeedParser, IngestionError, IngestionJob, StaticFeed,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "ingestion", version, about = "PaperPulse feed ingestion")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch the feed once and store every parsed paper
    Run {
        /// Number of entries to request (clamped to the configured cap)
        #[arg(long)]
        max_results: Option<i64>,

        /// Free-text query, overriding `feed.query`
        #[arg(long)]
        query: Option<String>,

        /// Read the feed from a saved document instead of the network
        #[arg(long)]
        feed_file: Option<PathBuf>,

        /// Store into memory only and print the report
        #[arg(long)]
        dry_run: bool,
    },

    /// Apply pending schema migrations
    Migrate,

    /// Parse a saved feed document and print the records as JSON
    Parse {
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = AppConfig::load().context("Failed to load configuration")?;

    init_tracing(&config);

    info!("Starting PaperPulse Ingestion v{}", VERSION);

    match cli.command {
        Commands::Run {
            max_results,
            query,
            feed_file,
            dry_run,
        } => run(&config, max_results, query, feed_file, dry_run).await,
        Commands::Migrate => {
            let db = DbPool::new(&config.database).await?;
            db.migrate().await?;
            db.close().await?;
            Ok(())
        }
        Commands::Parse { file } => {
            let raw = read_feed(&file)?;
            let papers = FeedParser::from_config(&config.feed).parse(&raw);
            println!("{}", serde_json::to_string_pretty(&papers)?);
            Ok(())
        }
    }
}

async fn run(
    config: &AppConfig,
    max_results: Option<i64>,
    query: Option<String>,
    feed_file: Option<PathBuf>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let feed = open_feed(config, feed_file.as_deref())?;

    let mut db = None;
    let store: Arc<dyn PaperStore> = if dry_run {
        Arc::new(MemoryStore::new())
    } else {
        let pool = open_database(config).await?;
        db = Some(pool.clone());
        Arc::new(Repository::new(pool))
    };

    let job = IngestionJob::new(feed, store, config);
    let max_results = max_results.unwrap_or(config.feed.default_max_results);
    let report = match query {
        Some(query) => job.run_query(&query, max_results).await,
        None => job.run(max_results).await,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(db) = db {
        db.close().await?;
    }

    match report.error {
        Some(error) => anyhow::bail!("Ingestion run {} failed: {}", report.run_id, error),
        None => {
            info!("{}", report.message());
            Ok(())
        }
    }
}

fn open_feed(
    config: &AppConfig,
    feed_file: Option<&Path>,
) -> Result<Arc<dyn FeedClient>, IngestionError> {
    Ok(match feed_file {
        Some(path) => Arc::new(StaticFeed::new(read_feed(path)?)),
        None => Arc::new(ArxivClient::new(&config.feed)?),
    })
}

async fn open_database(config: &AppConfig) -> Result<DbPool, IngestionError> {
    let pool = DbPool::new(&config.database).await?;
    if config.database.run_migrations {
        pool.migrate().await?;
    }
    Ok(pool)
}

fn read_feed(path: &Path) -> Result<String, IngestionError> {
    std::fs::read_to_string(path).map_err(|source| IngestionError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    // Logs go to stderr so stdout stays machine-readable
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}
