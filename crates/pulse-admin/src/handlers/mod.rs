pub mod changelog;
pub mod feedback;

use axum::{
  http::{HeaderValue, header},
  response::Response,
};
use pulse_core::{UserIdentity, resolve::resolve_identity, store::SessionStore};
use serde::Serialize;

use crate::{AppState, auth::AdminContext, error::Error};

/// JSON payload a route hands to its page.
#[derive(Debug, Serialize)]
pub struct LoaderData {
  pub user: UserIdentity,
}

pub(super) async fn resolve_user<S>(
  state: &AppState<S>,
  ctx:   &AdminContext,
) -> Result<UserIdentity, Error>
where
  S: SessionStore + Clone + Send + Sync + 'static,
{
  resolve_identity(&ctx.session, state.store.as_ref(), &ctx.admin)
    .await
    .map_err(|e| Error::Store(Box::new(e)))
}

/// Allow the admin host and the shop itself to frame the response.
pub(super) fn embedded(mut res: Response, shop: &str) -> Response {
  let csp = format!("frame-ancestors https://{shop} https://admin.shopify.com;");
  if let Ok(value) = HeaderValue::from_str(&csp) {
    res.headers_mut().insert(header::CONTENT_SECURITY_POLICY, value);
  }
  res
}

pub(super) fn or_na(value: &Option<String>) -> &str {
  value.as_deref().unwrap_or("N/A")
}
