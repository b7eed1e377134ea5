//! Cherry HTTP server: configuration loading and the top-level router.
//!
//! The binary in `main.rs` wires these to a SQLite store, a filesystem
//! content directory and a TCP listener.

use std::path::{Path, PathBuf};

use axum::Router;
use cherry_core::{
  service::EntityService,
  store::{ContentStore, EntityStore},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

/// Prefix every API route is mounted under.
pub const API_PREFIX: &str = "/api/v1";

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime configuration, read from a TOML file overlaid with `CHERRY_*`
/// environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:        String,
  pub port:        u16,
  pub store_path:  PathBuf,
  pub content_dir: PathBuf,
  /// Name stamped into `created_by` / `modified_by`.
  pub auditor:     String,
}

impl ServerConfig {
  /// Load from `path` (optional) and the environment, falling back to
  /// built-in defaults for missing keys.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .set_default("host", "127.0.0.1")?
      .set_default("port", 8080)?
      .set_default("store_path", "~/.local/share/cherry/cherry.db")?
      .set_default("content_dir", "~/.local/share/cherry/content")?
      .set_default("auditor", "cherry")?
      .add_source(config::File::from(path.to_path_buf()).required(false))
      .add_source(config::Environment::with_prefix("CHERRY"))
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// The API mounted under [`API_PREFIX`], with request tracing.
pub fn router<S, C>(service: EntityService<S, C>) -> Router
where
  S: EntityStore + 'static,
  C: ContentStore + 'static,
{
  Router::new()
    .nest(API_PREFIX, cherry_api::api_router(service))
    .layer(TraceLayer::new_for_http())
}
