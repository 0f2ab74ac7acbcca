//! `/app/changelog`: hosts the third-party changelog widget.

use axum::{
  Json,
  extract::State,
  response::{Html, IntoResponse, Response},
};
use pulse_core::{UserIdentity, refine::refine, store::SessionStore};

use super::{LoaderData, embedded, resolve_user};
use crate::{
  AppConfig, AppState,
  auth::AdminContext,
  error::Error,
  html::{Document, script_json},
  widget::{ChangelogWidget, DocumentHead, TARGET_CONTAINER_ID},
};

/// `GET /app/changelog.data`
pub async fn loader<S>(
  State(state): State<AppState<S>>,
  ctx: AdminContext,
) -> Result<Response, Error>
where
  S: SessionStore + Clone + Send + Sync + 'static,
{
  let user = resolve_user(&state, &ctx).await?;
  Ok(embedded(Json(LoaderData { user }).into_response(), &ctx.session.shop))
}

/// `GET /app/changelog`
pub async fn page<S>(
  State(state): State<AppState<S>>,
  ctx: AdminContext,
) -> Result<Response, Error>
where
  S: SessionStore + Clone + Send + Sync + 'static,
{
  let user = resolve_user(&state, &ctx).await?;
  let html = render(&state.config, user)?;
  Ok(embedded(Html(html).into_response(), &ctx.session.shop))
}

pub fn render(config: &AppConfig, user: UserIdentity) -> Result<String, Error> {
  // No bridge result exists yet at first render.
  let displayed = refine(&user, None);

  let mut head = DocumentHead::default();
  ChangelogWidget::new(&config.widget).show(&mut head, &displayed);

  let data_json = script_json(&LoaderData { user })?;
  let document = Document {
    title:     "Changelog",
    api_key:   &config.api_key,
    head:      &head,
    data_json: &data_json,
  };

  Ok(document.render(|w| {
    w.start("s-page", &[("heading", "Changelog")])
      .start("div", &[
        ("id", TARGET_CONTAINER_ID),
        ("style", "width: 100%; margin: 0; padding: 2rem; position: relative;"),
      ])
      .end("div")
      .end("s-page");
  }))
}
