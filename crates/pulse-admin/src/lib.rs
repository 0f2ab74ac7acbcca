//! Embedded admin routes for Pulse.
//!
//! Exposes an axum [`Router`] serving the changelog and request-feedback
//! pages, backed by any [`SessionStore`]. Each page resolves the current
//! user from the stored session, the session token's online-access claims
//! and, when needed, the shop's contact email from the Admin API.

pub mod admin_api;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod html;
pub mod widget;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{Router, routing::get};
use pulse_core::store::SessionStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::SessionTokenVerifier;
use handlers::{changelog, feedback};
use widget::WidgetConfig;

// ─── Configuration ────────────────────────────────────────────────────────────

fn default_api_version() -> String { "2025-10".to_owned() }

/// Runtime configuration, deserialised from `config.toml` and `PULSE_*`
/// environment variables.
#[derive(Deserialize, Clone)]
pub struct AppConfig {
  pub host:              String,
  pub port:              u16,
  pub app_url:           String,
  pub api_key:           String,
  pub api_secret:        String,
  #[serde(default = "default_api_version")]
  pub api_version:       String,
  #[serde(default)]
  pub use_online_tokens: bool,
  pub store_path:        PathBuf,
  /// Replaces `https://{shop}` as the Admin API origin when set.
  #[serde(default)]
  pub admin_api_origin:  Option<String>,
  #[serde(default)]
  pub widget:            WidgetConfig,
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: SessionStore> {
  pub store:  Arc<S>,
  pub config: Arc<AppConfig>,
  pub auth:   Arc<SessionTokenVerifier>,
  pub http:   reqwest::Client,
}

impl<S: SessionStore> AppState<S> {
  pub fn new(store: S, config: AppConfig) -> reqwest::Result<Self> {
    Ok(Self {
      store:  Arc::new(store),
      auth:   Arc::new(SessionTokenVerifier::new(&config.api_key, &config.api_secret)),
      config: Arc::new(config),
      http:   admin_api::http_client()?,
    })
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the admin app.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: SessionStore + Clone + Send + Sync + 'static,
{
  Router::new()
    .route("/app/changelog",             get(changelog::page::<S>))
    .route("/app/changelog.data",        get(changelog::loader::<S>))
    .route("/app/request-feedback",      get(feedback::page::<S>))
    .route("/app/request-feedback.data", get(feedback::loader::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────
