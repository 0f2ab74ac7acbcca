//! The `SessionStore` trait.
//!
//! Implemented by storage backends (e.g. `pulse-store-sqlite`). The admin
//! app depends on this abstraction, not on any concrete backend.

use std::future::Future;

use crate::session::Session;

/// Persistence for platform sessions.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait SessionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Insert `session`, replacing any stored session with the same id.
  fn store_session<'a>(
    &'a self,
    session: &'a Session,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Retrieve a session by id. Returns `None` if not found.
  fn load_session<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<Session>, Self::Error>> + Send + 'a;

  /// Delete a session by id. Returns whether a session was removed;
  /// deleting a missing id is not an error.
  fn delete_session<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Delete every listed session, returning how many were removed.
  fn delete_sessions<'a>(
    &'a self,
    ids: &'a [String],
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  /// All sessions, online and offline, stored for `shop`.
  fn find_sessions_by_shop<'a>(
    &'a self,
    shop: &'a str,
  ) -> impl Future<Output = Result<Vec<Session>, Self::Error>> + Send + 'a;
}
