//! Error types and axum `IntoResponse` implementation.

use axum::{
  http::{HeaderName, HeaderValue, StatusCode},
  response::{IntoResponse, Response},
};
use thiserror::Error;

/// Header telling the embedded frontend to fetch a fresh session token and
/// retry the request.
pub const RETRY_INVALID_SESSION: HeaderName =
  HeaderName::from_static("x-shopify-retry-invalid-session-request");

#[derive(Debug, Error)]
pub enum Error {
  #[error("unauthorized")]
  Unauthorized,
  #[error("invalid session token: {0}")]
  InvalidToken(#[from] jsonwebtoken::errors::Error),
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
  #[error("render error: {0}")]
  Render(#[from] serde_json::Error),
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::Unauthorized | Error::InvalidToken(_) => {
        let mut res =
          (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        res
          .headers_mut()
          .insert(RETRY_INVALID_SESSION, HeaderValue::from_static("1"));
        res
      }
      Error::Store(e) => {
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
      }
      Error::Render(e) => {
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
      }
    }
  }
}
