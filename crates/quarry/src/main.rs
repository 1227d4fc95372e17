//! # Quarry CLI
//!
//! Command-line interface for Quarry, a semantic retrieval engine over
//! heterogeneous text sources.
//!
//! ## Commands
//!
//! - `quarry ingest <INPUT>` - Segment, embed, and index a corpus of records
//! - `quarry query <QUERY>` - Search the index for relevant fragments
//! - `quarry status` - Show index statistics
//!
//! ## Examples
//!
//! ```bash
//! # Ingest a JSON array of {text, source_id, ...} records
//! quarry ingest corpus.json
//!
//! # Search it
//! quarry query "what are the treatment options" -k 5
//!
//! # Get JSON output for downstream tooling
//! quarry query "treatment options" --format json
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use quarry_core::{Embedder, SearchResult, SegmentConfig, SourceRecord, VectorIndex};
#[cfg(feature = "candle")]
use quarry_embed::{CandleEmbedder, EmbeddingCache};
use quarry_embed::{EmbedderPool, OfflineEmbedder, RetryPolicy};
use quarry_index::MemoryIndex;
use quarry_ingest::{IngestConfig, IngestUpdate, Ingestor};
use quarry_retrieve::{RetrieveOptions, Retriever};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

mod config;

use config::{data_dir, Config};

#[derive(Parser)]
#[command(name = "quarry")]
#[command(about = "Semantic document retrieval over heterogeneous text sources")]
#[command(version)]
struct Cli {
    /// Path to config file (default: ~/.config/quarry/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Use the degraded offline embedder (zero vectors, test only)
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Segment, embed, and index a corpus of source records
    Ingest {
        /// JSON file holding an array of {text, source_id, ...} records
        input: PathBuf,

        /// Index snapshot path (default: data dir)
        #[arg(long)]
        index: Option<PathBuf>,

        /// Normalize whitespace and punctuation before segmentation
        #[arg(long)]
        normalize: bool,
    },

    /// Query the index
    Query {
        /// Natural-language query
        query: String,

        /// Index snapshot path (default: data dir)
        #[arg(long)]
        index: Option<PathBuf>,

        /// Number of results to return
        #[arg(short)]
        k: Option<usize>,

        /// Return at most one result per source
        #[arg(long)]
        diverse: bool,
    },

    /// Show index statistics
    Status {
        /// Index snapshot path (default: data dir)
        #[arg(long)]
        index: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    init_logging(cli.verbose, &config.logging.level)?;

    match cli.command {
        Commands::Ingest {
            input,
            index,
            normalize,
        } => {
            let index_path = resolve_index_path(index)?;
            run_ingest(&config, &input, &index_path, normalize, cli.offline, cli.format).await
        }
        Commands::Query {
            query,
            index,
            k,
            diverse,
        } => {
            let index_path = resolve_index_path(index)?;
            run_query(&config, &query, &index_path, k, diverse, cli.offline, cli.format).await
        }
        Commands::Status { index } => {
            let index_path = resolve_index_path(index)?;
            run_status(&config, &index_path, cli.offline, cli.format).await
        }
    }
}

fn init_logging(verbose: bool, level: &str) -> Result<()> {
    let level = if verbose {
        Level::DEBUG
    } else {
        level.parse().unwrap_or(Level::INFO)
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to set up logging")?;
    Ok(())
}

fn resolve_index_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    match data_dir() {
        Some(dir) => Ok(dir.join("index.json")),
        None => bail!("cannot determine a data directory; pass --index explicitly"),
    }
}

/// Construct the embedder the build provides.
#[cfg(feature = "candle")]
fn build_embedder(offline: bool) -> Arc<dyn Embedder> {
    if offline {
        warn!("--offline selected; vectors will be zeros and carry no meaning");
        return Arc::new(OfflineEmbedder::new());
    }
    let cache_dir = data_dir()
        .map(|dir| dir.join("models"))
        .unwrap_or_else(|| PathBuf::from(".quarry-models"));
    let embedder: Arc<dyn Embedder> = Arc::new(CandleEmbedder::new(cache_dir));
    Arc::new(EmbeddingCache::new(embedder))
}

#[cfg(not(feature = "candle"))]
fn build_embedder(_offline: bool) -> Arc<dyn Embedder> {
    warn!("built without the candle feature; using the degraded offline embedder");
    Arc::new(OfflineEmbedder::new())
}

/// Open the snapshot at `path` if it exists, checked against the embedder.
async fn open_index(
    path: &std::path::Path,
    embedder: &Arc<dyn Embedder>,
) -> Result<Option<MemoryIndex>> {
    if !path.exists() {
        return Ok(None);
    }
    let index = MemoryIndex::load(path, embedder.model_id(), embedder.dimension())
        .await
        .with_context(|| {
            format!(
                "failed to load index snapshot at {}; re-run ingest to rebuild it",
                path.display()
            )
        })?;
    Ok(Some(index))
}

#[derive(Serialize)]
struct IngestSummary {
    records_ingested: u64,
    records_skipped: u64,
    chunks_indexed: u64,
    batches_failed: u64,
    index_path: String,
}

async fn run_ingest(
    config: &Config,
    input: &std::path::Path,
    index_path: &std::path::Path,
    normalize: bool,
    offline: bool,
    format: OutputFormat,
) -> Result<()> {
    let raw = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("failed to read {}", input.display()))?;
    let records: Vec<SourceRecord> =
        serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", input.display()))?;

    let embedder = build_embedder(offline);

    // Extend an existing snapshot when one is present and compatible.
    let index = match open_index(index_path, &embedder).await? {
        Some(index) => {
            info!("extending existing index at {}", index_path.display());
            Arc::new(index)
        }
        None => Arc::new(MemoryIndex::new(embedder.model_id(), embedder.dimension())),
    };

    let pool = Arc::new(EmbedderPool::with_retry(
        Arc::clone(&embedder),
        config.embedding.max_concurrent,
        RetryPolicy {
            max_retries: config.embedding.max_retries,
            ..RetryPolicy::default()
        },
    ));

    let ingest_config = IngestConfig {
        segment: SegmentConfig {
            max_chunk_size: config.segment.max_chunk_size,
            overlap: config.segment.overlap,
        },
        batch_size: config.embedding.batch_size,
        normalize: normalize || config.segment.normalize,
    };

    let ingestor = Ingestor::new(pool, Arc::clone(&index) as Arc<dyn VectorIndex>, ingest_config);

    let mut updates = ingestor.subscribe();
    let progress = tokio::spawn(async move {
        while let Ok(update) = updates.recv().await {
            match update {
                IngestUpdate::RecordIngested {
                    source_id,
                    chunk_count,
                } => info!("indexed {source_id} ({chunk_count} chunks)"),
                IngestUpdate::RecordSkipped { source_id } => {
                    warn!("skipped {source_id} (no usable text)");
                }
                IngestUpdate::BatchFailed { source_id, error } => {
                    warn!("batch failed for {source_id}: {error}");
                }
            }
        }
    });

    let report = ingestor.ingest(&records).await?;
    drop(ingestor);
    let _ = progress.await;

    index.persist(index_path).await.map_err(quarry_core::Error::Index)?;

    let summary = IngestSummary {
        records_ingested: report.records_ingested,
        records_skipped: report.records_skipped,
        chunks_indexed: report.chunks_indexed,
        batches_failed: report.batches_failed,
        index_path: index_path.display().to_string(),
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Text => {
            println!(
                "Ingested {} records ({} chunks) into {}",
                summary.records_ingested, summary.chunks_indexed, summary.index_path
            );
            if summary.records_skipped > 0 {
                println!("Skipped {} records with no usable text", summary.records_skipped);
            }
            if summary.batches_failed > 0 {
                println!(
                    "{} embedding batches failed permanently; their chunks are not indexed",
                    summary.batches_failed
                );
            }
        }
    }

    Ok(())
}

async fn run_query(
    config: &Config,
    query: &str,
    index_path: &std::path::Path,
    k: Option<usize>,
    diverse: bool,
    offline: bool,
    format: OutputFormat,
) -> Result<()> {
    let embedder = build_embedder(offline);
    let Some(index) = open_index(index_path, &embedder).await? else {
        bail!(
            "no index found at {}; run `quarry ingest` first",
            index_path.display()
        );
    };

    if embedder.degraded() {
        warn!("querying with a degraded embedder; ranking will be meaningless");
    }

    let options = RetrieveOptions {
        k: k.unwrap_or(config.query.k),
        overfetch: config.query.overfetch,
        dedup_sources: diverse || config.query.dedup_sources,
    };
    let k = options.k;
    let retriever = Retriever::with_options(
        Arc::new(index) as Arc<dyn VectorIndex>,
        embedder,
        options,
    );

    let results = retriever.retrieve(query, k).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        OutputFormat::Text => print_results(query, &results),
    }

    Ok(())
}

fn print_results(query: &str, results: &[SearchResult]) {
    if results.is_empty() {
        println!("No relevant information found for {query:?}.");
        return;
    }

    println!("Results for {query:?}:\n");
    for (i, result) in results.iter().enumerate() {
        println!(
            "{}. [{:.4}] {}",
            i + 1,
            result.score,
            result.source_id
        );
        println!("   {}\n", preview(&result.content, 240));
    }
}

/// First `limit` characters of `text`, with an ellipsis when trimmed.
fn preview(text: &str, limit: usize) -> String {
    let flattened = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flattened.chars().count() <= limit {
        return flattened;
    }
    let mut shortened: String = flattened.chars().take(limit).collect();
    shortened.push('…');
    shortened
}

#[derive(Serialize)]
struct StatusSummary {
    chunk_count: u64,
    source_count: u64,
    dim: usize,
    model_id: String,
    last_updated: Option<String>,
    index_path: String,
}

async fn run_status(
    _config: &Config,
    index_path: &std::path::Path,
    offline: bool,
    format: OutputFormat,
) -> Result<()> {
    let embedder = build_embedder(offline);
    let Some(index) = open_index(index_path, &embedder).await? else {
        println!("No index found at {}.", index_path.display());
        return Ok(());
    };

    let stats = index.stats().await.map_err(quarry_core::Error::Index)?;
    let summary = StatusSummary {
        chunk_count: stats.chunk_count,
        source_count: stats.source_count,
        dim: stats.dim,
        model_id: index.model_id().to_string(),
        last_updated: stats.last_updated.map(|t| t.to_rfc3339()),
        index_path: index_path.display().to_string(),
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Text => {
            println!("Index at {}", summary.index_path);
            println!("  model:   {}", summary.model_id);
            println!("  dim:     {}", summary.dim);
            println!("  chunks:  {}", summary.chunk_count);
            println!("  sources: {}", summary.source_count);
            if let Some(updated) = &summary.last_updated {
                println!("  updated: {updated}");
            }
        }
    }

    Ok(())
}
