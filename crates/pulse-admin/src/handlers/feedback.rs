//! `/app/request-feedback`: a static feedback page showing the current user.

use axum::{
  Json,
  extract::State,
  response::{Html, IntoResponse, Response},
};
use pulse_core::{UserIdentity, refine::refine, store::SessionStore};
use tracing::info;

use super::{LoaderData, embedded, or_na, resolve_user};
use crate::{
  AppState,
  auth::AdminContext,
  error::Error,
  html::{Document, script_json},
  widget::DocumentHead,
};

const OFFLINE_TOKEN_HINT: &str = "Note: User information is not available. This may be because \
  the app is using offline tokens. Try reinstalling the app after enabling online tokens.";

/// Resolve and log the current user.
async fn current_user<S>(state: &AppState<S>, ctx: &AdminContext) -> Result<UserIdentity, Error>
where
  S: SessionStore + Clone + Send + Sync + 'static,
{
  let user = resolve_user(state, ctx).await?;
  info!(
    user_id = or_na(&user.id),
    email = or_na(&user.email),
    first_name = or_na(&user.first_name),
    last_name = or_na(&user.last_name),
    full_name = or_na(&user.full_name),
    shop = or_na(&user.shop),
    is_online = ctx.session.is_online,
    "current user information"
  );
  Ok(user)
}

/// `GET /app/request-feedback.data`
pub async fn loader<S>(
  State(state): State<AppState<S>>,
  ctx: AdminContext,
) -> Result<Response, Error>
where
  S: SessionStore + Clone + Send + Sync + 'static,
{
  let user = current_user(&state, &ctx).await?;
  Ok(embedded(Json(LoaderData { user }).into_response(), &ctx.session.shop))
}

/// `GET /app/request-feedback`
pub async fn page<S>(
  State(state): State<AppState<S>>,
  ctx: AdminContext,
) -> Result<Response, Error>
where
  S: SessionStore + Clone + Send + Sync + 'static,
{
  let user = current_user(&state, &ctx).await?;
  let html = render(&state.config.api_key, user)?;
  Ok(embedded(Html(html).into_response(), &ctx.session.shop))
}

pub fn render(api_key: &str, user: UserIdentity) -> Result<String, Error> {
  let shown = refine(&user, None);
  let head = DocumentHead::default();
  let data_json = script_json(&LoaderData { user })?;
  let document = Document {
    title:     "Request Feedback",
    api_key,
    head:      &head,
    data_json: &data_json,
  };

  Ok(document.render(|w| {
    w.start("s-page", &[("heading", "Request Feedback")])
      .start("s-section", &[("heading", "Request Feedback")])
      .start("s-paragraph", &[])
      .text("This is the Request Feedback page. Add your feedback request form here.")
      .end("s-paragraph")
      .start("s-section", &[("heading", "Current User")]);

    let rows = [
      ("User ID", &shown.id),
      ("Email", &shown.email),
      ("Name", &shown.full_name),
      ("Shop", &shown.shop),
    ];
    for (label, value) in rows {
      w.start("s-paragraph", &[])
        .text_elem("s-text", &[], &format!("{label}: {}", or_na(value)))
        .end("s-paragraph");
    }

    if shown.id.is_none() {
      w.start("s-paragraph", &[])
        .text_elem("s-text", &[("tone", "warning")], OFFLINE_TOKEN_HINT)
        .end("s-paragraph");
    }

    w.end("s-section").end("s-section").end("s-page");
  }))
}
