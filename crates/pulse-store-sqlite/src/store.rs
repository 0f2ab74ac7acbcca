//! [`SqliteStore`]: the SQLite implementation of [`SessionStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;

use pulse_core::{session::Session, store::SessionStore};

use crate::{
  Error, Result,
  encode::{RawSession, SESSION_COLUMNS},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Pulse session store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run raw SQL against the connection, for tests that shape rows the
  /// public API never writes.
  #[cfg(test)]
  pub(crate) async fn execute_raw(&self, sql: &'static str) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── SessionStore impl ───────────────────────────────────────────────────────

impl SessionStore for SqliteStore {
  type Error = Error;

  async fn store_session(&self, session: &Session) -> Result<()> {
    let raw = RawSession::from_session(session);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO sessions (
             id, shop, state, is_online, scope, expires, access_token,
             user_id, first_name, last_name, email, account_owner, locale,
             collaborator, email_verified
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
          rusqlite::params![
            raw.id,
            raw.shop,
            raw.state,
            raw.is_online,
            raw.scope,
            raw.expires,
            raw.access_token,
            raw.user_id,
            raw.first_name,
            raw.last_name,
            raw.email,
            raw.account_owner,
            raw.locale,
            raw.collaborator,
            raw.email_verified,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn load_session(&self, id: &str) -> Result<Option<Session>> {
    let id = id.to_owned();

    let raw: Option<RawSession> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"),
            rusqlite::params![id],
            RawSession::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSession::into_session).transpose()
  }

  async fn delete_session(&self, id: &str) -> Result<bool> {
    let id = id.to_owned();

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM sessions WHERE id = ?1", rusqlite::params![id])?)
      })
      .await?;
    Ok(removed > 0)
  }

  async fn delete_sessions(&self, ids: &[String]) -> Result<usize> {
    let ids = ids.to_vec();

    let removed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut removed = 0;
        {
          let mut stmt = tx.prepare("DELETE FROM sessions WHERE id = ?1")?;
          for id in &ids {
            removed += stmt.execute(rusqlite::params![id])?;
          }
        }
        tx.commit()?;
        Ok(removed)
      })
      .await?;
    Ok(removed)
  }

  async fn find_sessions_by_shop(&self, shop: &str) -> Result<Vec<Session>> {
    let shop = shop.to_owned();

    let raws: Vec<RawSession> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SESSION_COLUMNS} FROM sessions WHERE shop = ?1 ORDER BY id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![shop], RawSession::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSession::into_session).collect()
  }
}
