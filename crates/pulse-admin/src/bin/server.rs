//! pulse-admin server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) layered with
//! `PULSE_*` environment variables, opens the SQLite session store, and
//! serves the embedded admin routes over HTTP.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use pulse_admin::{AppConfig, AppState};
use pulse_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Pulse embedded admin server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
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

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("PULSE"))
    .build()
    .context("failed to read config file")?;

  let mut app_cfg: AppConfig = settings
    .try_deserialize()
    .context("failed to deserialise AppConfig")?;
  app_cfg.store_path = expand_tilde(&app_cfg.store_path);

  let store = SqliteStore::open(&app_cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", app_cfg.store_path))?;

  let address = format!("{}:{}", app_cfg.host, app_cfg.port);
  let app_url = app_cfg.app_url.clone();

  let state =
    AppState::new(store, app_cfg).context("failed to build HTTP client")?;
  let app = pulse_admin::router(state);

  tracing::info!(%app_url, "Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
