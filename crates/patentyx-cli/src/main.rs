//! Patentyx — patent ingestion and coverage reporting.
//! Entry point for the `patentyx` binary.

mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "patentyx", version, about = "Ingest patent records and report corpus coverage")]
struct Cli {
    /// Log filter (overrides RUST_LOG), e.g. `debug` or `patentyx_ingestion=trace`
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch, merge, enrich and normalise patent records
    Ingest(IngestArgs),
    /// Compare a canonical doc-number list against ingested documents
    Coverage(CoverageArgs),
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Query override document (JSON, YAML or TOML)
    #[arg(long, env = "PATENTYX_QUERY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Records requested per provider page
    #[arg(long)]
    pub per_page: Option<usize>,

    /// Maximum pages fetched per provider
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// Extra raw records (JSON array, JSON object or JSONL)
    #[arg(long)]
    pub manual: Option<PathBuf>,

    /// Directory of `<doc>.json` / `<doc>.txt` full-text files
    #[arg(long)]
    pub full_text_dir: Option<PathBuf>,

    /// Do not scrape Google Patents for missing full text
    #[arg(long)]
    pub disable_google: bool,

    /// Normalise but skip persistence
    #[arg(long)]
    pub dry_run: bool,

    /// Write the merged raw records to `<raw-dir>/payload_snapshot.json`
    #[arg(long)]
    pub save_raw: bool,

    #[arg(long, default_value = "data/raw")]
    pub raw_dir: PathBuf,

    /// Where to write the stored (or, on a dry run, normalised) documents as JSON
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct CoverageArgs {
    /// Canonical doc numbers (JSON array, array of objects, object, JSONL or plain lines)
    #[arg(long)]
    pub canonical: PathBuf,

    /// Doc numbers present in storage, same accepted layouts
    #[arg(long)]
    pub present: PathBuf,

    /// Optional path for the report as JSON
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialise structured logging
    let filter = match cli.log_level.as_deref() {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("patentyx=info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Command::Ingest(args) => commands::ingest(args).await,
        Command::Coverage(args) => commands::coverage(args),
    }
}
