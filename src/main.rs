//! Binary entry point for wordvec.
//!
//! Subcommands:
//!
//! - `serve`: run the HTTP API
//! - `migrate`: create the pgvector extension, table and index
//! - `load`: bulk-load a GloVe-format vectors file

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// CLI output goes to stdout/stderr directly.
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
#![allow(clippy::multiple_crate_versions)]

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use wordvec::config::{AppConfig, StoreBackend};
use wordvec::http::{self, AppState};
use wordvec::ingest::{self, LoadOptions};
use wordvec::observability::{self, ObservabilityConfig};
use wordvec::storage::{EmbeddingStore, MemoryStore, PgvectorStore};
use wordvec::{Metric, WordService};

/// wordvec - word embedding lookups, neighbours and analogies over pgvector.
#[derive(Parser)]
#[command(name = "wordvec")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API.
    Serve {
        /// Port to listen on (overrides config and `PORT`).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Create the extension, embeddings table and HNSW index.
    Migrate {
        /// Vector width of the embeddings column.
        #[arg(short, long, env = "WORDVEC_DIMENSIONS")]
        dimensions: Option<usize>,

        /// Metric whose operator class the index uses.
        #[arg(short, long)]
        metric: Option<Metric>,

        /// Skip index creation.
        #[arg(long)]
        no_index: bool,
    },

    /// Load a GloVe-format vectors file into the table.
    Load {
        /// Vectors file (`word v1 v2 ... vd` per line).
        file: PathBuf,

        /// Vector width; lines of any other width are skipped.
        #[arg(short, long, env = "WORDVEC_DIMENSIONS")]
        dimensions: Option<usize>,

        /// Rows per insert transaction.
        #[arg(short, long, default_value = "10000")]
        batch_size: usize,

        /// Leading lines to ignore.
        #[arg(long, default_value = "0")]
        skip_lines: usize,
    },
}

/// Main entry point.
#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    let _observability =
        match observability::init(ObservabilityConfig::from_app_config(&config, cli.verbose)) {
            Ok(handle) => handle,
            Err(e) => {
                eprintln!("Failed to initialize observability: {e}");
                return ExitCode::FAILURE;
            },
        };

    match run_command(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
async fn run_command(command: Commands, config: AppConfig) -> anyhow::Result<()> {
    match command {
        Commands::Serve { port } => cmd_serve(config, port).await,
        Commands::Migrate {
            dimensions,
            metric,
            no_index,
        } => cmd_migrate(&config, dimensions, metric, no_index).await,
        Commands::Load {
            file,
            dimensions,
            batch_size,
            skip_lines,
        } => cmd_load(&config, file, dimensions, batch_size, skip_lines).await,
    }
}

/// Builds the configured store.
async fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn EmbeddingStore>> {
    match config.store.backend {
        StoreBackend::Postgres => {
            let store = PgvectorStore::new(&config.database)?;
            tracing::info!(table = store.table(), "Using pgvector store");
            Ok(Arc::new(store))
        },
        StoreBackend::Memory => {
            let (Some(path), Some(dimensions)) = (&config.store.vectors_file, config.store.dimensions)
            else {
                bail!("the memory backend needs store.vectors_file and store.dimensions");
            };
            let store = MemoryStore::new(dimensions);
            let report = ingest::load_file(path, &store, LoadOptions::new(dimensions))
                .await
                .with_context(|| format!("loading {}", path.display()))?;
            tracing::info!(words = report.inserted, file = %path.display(), "Using memory store");
            Ok(Arc::new(store))
        },
    }
}

async fn cmd_serve(mut config: AppConfig, port: Option<u16>) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }
    let store = build_store(&config).await?;
    let service = WordService::new(store, config.search);
    let app = http::router(AppState::new(service), &config.server)?;

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    http::serve(listener, app, http::shutdown_signal()).await?;
    Ok(())
}

async fn cmd_migrate(
    config: &AppConfig,
    dimensions: Option<usize>,
    metric: Option<Metric>,
    no_index: bool,
) -> anyhow::Result<()> {
    let Some(dimensions) = dimensions.or(config.store.dimensions).filter(|d| *d > 0) else {
        bail!("--dimensions (or store.dimensions) is required");
    };
    let store = PgvectorStore::new(&config.database)?;
    let version = store.run_migrations(dimensions).await?;
    println!("Schema for {} at version {version}", store.table());

    if !no_index {
        let metric = metric.unwrap_or(config.search.default_metric);
        store.ensure_index(metric).await?;
        println!("HNSW index ready for metric {metric}");
    }
    Ok(())
}

async fn cmd_load(
    config: &AppConfig,
    file: PathBuf,
    dimensions: Option<usize>,
    batch_size: usize,
    skip_lines: usize,
) -> anyhow::Result<()> {
    let Some(dimensions) = dimensions.or(config.store.dimensions) else {
        bail!("--dimensions (or store.dimensions) is required");
    };
    let store = PgvectorStore::new(&config.database)?;
    let options = LoadOptions::new(dimensions)
        .with_batch_size(batch_size)
        .with_skip_lines(skip_lines);
    let report = ingest::load_file(&file, &store, options).await?;

    println!(
        "Loaded {} words into {} ({} already present, {} malformed lines skipped)",
        report.inserted,
        store.table(),
        report.skipped_duplicates,
        report.skipped_malformed
    );
    Ok(())
}
