//! `gibreg` keeps a local mirror of the e-document user list.
//!
//! Reads `config.toml` (or the path given with `--config`) plus the
//! environment-specific overlay selected by `GIBREG_ENV`, opens the SQLite
//! store, and runs one command.
//!
//! ```text
//! gibreg sync ./parts/
//! gibreg active --document-type DespatchAdvice --limit 20
//! gibreg history 1234567890
//! gibreg serve
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use chrono::Utc;
use clap::{Parser, Subcommand};
use gibreg_core::{
  entry::{DocumentType, RegistryEntry},
  store::{EntryFilter, RegistryStore},
};
use gibreg_store_sqlite::SqliteStore;
use gibreg_sync::{
  PartFileSource, Settings,
  config::{DEFAULT_ENV, ENV_VAR},
  run_sweep,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "E-document user list mirror")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Reconcile the store against downloaded user-list parts.
  Sync {
    /// Part archives, or directories containing them.
    #[arg(required = true)]
    parts: Vec<PathBuf>,
  },
  /// List active entries.
  Active {
    #[arg(long)]
    identifier:    Option<String>,
    /// `Invoice` or `DespatchAdvice`.
    #[arg(long, value_parser = parse_document_type)]
    document_type: Option<DocumentType>,
    #[arg(long, default_value_t = 10)]
    limit:         usize,
    #[arg(long, default_value_t = 0)]
    offset:        usize,
  },
  /// Show every entry ever recorded for a subject, active or not.
  History { identifier: String },
  /// Print active and total entry counts.
  Stats,
  /// Serve the read-only JSON API.
  Serve,
}

fn parse_document_type(s: &str) -> Result<DocumentType, String> {
  DocumentType::parse(s).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let env = std::env::var(ENV_VAR).unwrap_or_else(|_| DEFAULT_ENV.to_string());
  let settings = Settings::load(&cli.config, &env)
    .with_context(|| format!("failed to load configuration for {env:?}"))?;

  let store_path = settings.resolved_store_path();
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  tracing::debug!(?store_path, %env, "store opened");

  match cli.command {
    Command::Sync { parts } => sync(&store, &parts).await,
    Command::Active {
      identifier,
      document_type,
      limit,
      offset,
    } => {
      let filter = EntryFilter {
        identifier,
        document_type,
        include_inactive: false,
      };
      let entries = store
        .find_active(&filter, limit, offset)
        .await
        .context("query failed")?;
      print_entries(&entries);
      Ok(())
    }
    Command::History { identifier } => {
      let entries = store
        .find_all_by_identifier(&identifier)
        .await
        .context("query failed")?;
      print_entries(&entries);
      Ok(())
    }
    Command::Stats => {
      let stats = store.stats().await.context("query failed")?;
      println!("active\t{}", stats.active);
      println!("total\t{}", stats.total);
      Ok(())
    }
    Command::Serve => serve(store, &settings).await,
  }
}

async fn sync(store: &SqliteStore, parts: &[PathBuf]) -> anyhow::Result<()> {
  let mut source =
    PartFileSource::from_paths(parts).context("failed to collect part archives")?;
  tracing::info!(parts = source.remaining(), "starting sweep");

  let report = run_sweep(store, &mut source, Utc::now())
    .await
    .context("sweep aborted")?;

  println!("sweep        {}", report.sweep_id);
  println!("observed at  {}", report.observed_at.to_rfc3339());
  println!("parts        {}", report.batches);
  println!("upserted     {}", report.upserted);
  println!("rejected     {}", report.rejected);
  println!("skipped      {}", report.skipped.total());
  println!("deactivated  {}", report.deactivated);
  println!("active       {}", report.stats.active);
  println!("total        {}", report.stats.total);
  Ok(())
}

async fn serve(store: SqliteStore, settings: &Settings) -> anyhow::Result<()> {
  let app = gibreg_api::api_router(Arc::new(store)).layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", settings.host, settings.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;
  Ok(())
}

fn print_entries(entries: &[RegistryEntry]) {
  for e in entries {
    println!(
      "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
      e.id,
      e.identifier,
      e.alias,
      e.document_type,
      e.kind,
      if e.is_active { "active" } else { "inactive" },
      e.last_synced_at.to_rfc3339(),
      e.title.as_deref().unwrap_or("-"),
    );
  }
}
