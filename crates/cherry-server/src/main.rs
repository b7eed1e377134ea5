//! cherry server binary.
//!
//! Reads `cherry.toml` (or the path given with `--config`), opens the SQLite
//! store and the content directory, and serves the JSON API over HTTP.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use cherry_core::service::EntityService;
use cherry_server::{API_PREFIX, ServerConfig, expand_tilde};
use cherry_store_sqlite::{FsContentStore, SqliteStore};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Cherry person and contact entity server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "cherry.toml")]
  config: PathBuf,
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

  let cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load config from {:?}", cli.config))?;

  let store_path = expand_tilde(&cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let content_dir = expand_tilde(&cfg.content_dir);
  let content = FsContentStore::open(&content_dir)
    .await
    .with_context(|| format!("failed to open content dir {content_dir:?}"))?;

  let service =
    EntityService::new(Arc::new(store), Arc::new(content), cfg.auditor.clone());
  let app = cherry_server::router(service);

  let address = cfg.address();
  tracing::info!(auditor = %cfg.auditor, "Listening on http://{address}{API_PREFIX}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
