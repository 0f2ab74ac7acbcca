//! Session-token authentication for embedded admin requests.
//!
//! The embedded frontend sends a short-lived HS256 JWT signed with the app's
//! API secret, either as `Authorization: Bearer <token>` or as the
//! `id_token` query parameter on document requests. A valid token names the
//! shop (`dest`) and the staff user (`sub`); the matching stored session
//! becomes the request's [`AdminContext`].

use axum::{
  extract::{FromRequestParts, Query},
  http::{HeaderMap, header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use pulse_core::{
  session::{Session, sanitize_shop},
  store::SessionStore,
};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{AppState, admin_api::AdminApiClient, error::Error};

/// Claims carried by a platform session token.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionTokenClaims {
  pub iss: String,
  pub dest: String,
  pub aud: String,
  #[serde(default)]
  pub sub: Option<String>,
  pub exp: i64,
  #[serde(default)]
  pub nbf: Option<i64>,
  #[serde(default)]
  pub iat: Option<i64>,
  #[serde(default)]
  pub jti: Option<String>,
  #[serde(default)]
  pub sid: Option<String>,
}

/// Verifies session tokens issued for one app.
pub struct SessionTokenVerifier {
  decoding_key: DecodingKey,
  validation:   Validation,
}

impl SessionTokenVerifier {
  pub fn new(api_key: &str, api_secret: &str) -> Self {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[api_key]);
    validation.set_required_spec_claims(&["exp", "nbf", "aud"]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = 5;

    Self {
      decoding_key: DecodingKey::from_secret(api_secret.as_bytes()),
      validation,
    }
  }

  /// Decode and validate `token`. Also requires `iss` and `dest` to name the
  /// same shop.
  pub fn verify(&self, token: &str) -> Result<SessionTokenClaims, Error> {
    let claims =
      decode::<SessionTokenClaims>(token, &self.decoding_key, &self.validation)?
        .claims;

    let dest = sanitize_shop(&claims.dest).map_err(|_| Error::Unauthorized)?;
    let iss = sanitize_shop(&claims.iss).map_err(|_| Error::Unauthorized)?;
    if dest != iss {
      return Err(Error::Unauthorized);
    }
    Ok(claims)
  }
}

#[derive(Deserialize)]
struct TokenQuery {
  id_token: Option<String>,
}

/// Pull the raw session token from the bearer header or the `id_token`
/// query parameter, in that order.
pub fn session_token(parts: &Parts) -> Option<String> {
  bearer_token(&parts.headers).or_else(|| {
    Query::<TokenQuery>::try_from_uri(&parts.uri)
      .ok()
      .and_then(|Query(q)| q.id_token)
      .filter(|t| !t.is_empty())
  })
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .map(str::to_owned)
}

/// Present in a handler means the request carried a valid session token for
/// a shop with a live stored session.
pub struct AdminContext {
  pub session: Session,
  pub admin:   AdminApiClient,
}

/// Find the stored session a token refers to: the user's online session
/// when online tokens are in use, otherwise (or as a fallback) the shop's
/// offline session.
async fn find_session<S>(
  store:             &S,
  shop:              &str,
  sub:               Option<&str>,
  use_online_tokens: bool,
) -> Result<Option<Session>, Error>
where
  S: SessionStore,
{
  let user_id = sub.and_then(|s| s.parse::<i64>().ok());
  if use_online_tokens && let Some(user_id) = user_id {
    let online = store
      .load_session(&Session::online_id(shop, user_id))
      .await
      .map_err(|e| Error::Store(Box::new(e)))?;
    if online.is_some() {
      return Ok(online);
    }
    debug!(shop, user_id, "no online session, falling back to offline");
  }

  store
    .load_session(&Session::offline_id(shop))
    .await
    .map_err(|e| Error::Store(Box::new(e)))
}

impl<S> FromRequestParts<AppState<S>> for AdminContext
where
  S: SessionStore + Clone + Send + Sync + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let token = session_token(parts).ok_or(Error::Unauthorized)?;
    let claims = state.auth.verify(&token).inspect_err(|e| {
      debug!(error = %e, "rejected session token");
    })?;
    let shop = sanitize_shop(&claims.dest).map_err(|_| Error::Unauthorized)?;

    let session = find_session(
      state.store.as_ref(),
      &shop,
      claims.sub.as_deref(),
      state.config.use_online_tokens,
    )
    .await?
    .ok_or_else(|| {
      warn!(%shop, "no stored session for shop");
      Error::Unauthorized
    })?;

    if session.is_expired(Utc::now()) {
      warn!(session_id = %session.id, "stored session has expired");
      return Err(Error::Unauthorized);
    }

    let admin = AdminApiClient::new(
      state.http.clone(),
      state.config.admin_api_origin.as_deref(),
      &state.config.api_version,
      &session.shop,
      &session.access_token,
    );

    Ok(AdminContext { session, admin })
  }
}
