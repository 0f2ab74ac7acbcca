//! Encoding and decoding helpers between [`Session`] and the flat column
//! layout of the `sessions` table.
//!
//! Timestamps are stored as RFC 3339 strings. The online-access associated
//! user is flattened into nullable columns; a row with any of `user_id`,
//! `first_name`, `last_name`, `email` or `locale` set is read back with its
//! online-access info rebuilt from them.

use chrono::{DateTime, Utc};
use pulse_core::session::{AssociatedUser, OnlineAccessInfo, Session};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Raw row ─────────────────────────────────────────────────────────────────

/// Column list shared by every `SELECT` so [`RawSession::from_row`] can read
/// by position.
pub const SESSION_COLUMNS: &str = "id, shop, state, is_online, scope, expires, \
  access_token, user_id, first_name, last_name, email, account_owner, locale, \
  collaborator, email_verified";

/// A `sessions` row as plain column values.
///
/// The column set has no room for the online-access `expires_in` and
/// `associated_user_scope`, so both read back as `None`. `account_owner` is
/// `NOT NULL`: an unknown value is written as `false` and read back as
/// `Some(false)`.
#[derive(Debug, Clone)]
pub struct RawSession {
  pub id:             String,
  pub shop:           String,
  pub state:          String,
  pub is_online:      bool,
  pub scope:          Option<String>,
  pub expires:        Option<String>,
  pub access_token:   String,
  pub user_id:        Option<i64>,
  pub first_name:     Option<String>,
  pub last_name:      Option<String>,
  pub email:          Option<String>,
  pub account_owner:  bool,
  pub locale:         Option<String>,
  pub collaborator:   Option<bool>,
  pub email_verified: Option<bool>,
}

impl RawSession {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      shop:           row.get(1)?,
      state:          row.get(2)?,
      is_online:      row.get(3)?,
      scope:          row.get(4)?,
      expires:        row.get(5)?,
      access_token:   row.get(6)?,
      user_id:        row.get(7)?,
      first_name:     row.get(8)?,
      last_name:      row.get(9)?,
      email:          row.get(10)?,
      account_owner:  row.get(11)?,
      locale:         row.get(12)?,
      collaborator:   row.get(13)?,
      email_verified: row.get(14)?,
    })
  }

  pub fn from_session(session: &Session) -> Self {
    let user = session.associated_user();
    Self {
      id:             session.id.clone(),
      shop:           session.shop.clone(),
      state:          session.state.clone(),
      is_online:      session.is_online,
      scope:          session.scope.clone(),
      expires:        session.expires.map(encode_dt),
      access_token:   session.access_token.clone(),
      user_id:        user.and_then(|u| u.id),
      first_name:     user.and_then(|u| u.first_name.clone()),
      last_name:      user.and_then(|u| u.last_name.clone()),
      email:          user.and_then(|u| u.email.clone()),
      account_owner:  user.and_then(|u| u.account_owner).unwrap_or(false),
      locale:         user.and_then(|u| u.locale.clone()),
      collaborator:   user.and_then(|u| u.collaborator),
      email_verified: user.and_then(|u| u.email_verified),
    }
  }

  pub fn into_session(self) -> Result<Session> {
    let expires = self.expires.as_deref().map(decode_dt).transpose()?;

    // Any stored user column means there is a user to rebuild, even when the
    // platform never recorded its id.
    let has_user = self.user_id.is_some()
      || self.first_name.is_some()
      || self.last_name.is_some()
      || self.email.is_some()
      || self.locale.is_some();

    let online_access_info = has_user.then(|| OnlineAccessInfo {
      expires_in:            None,
      associated_user_scope: None,
      associated_user:       Some(AssociatedUser {
        id:             self.user_id,
        first_name:     self.first_name,
        last_name:      self.last_name,
        email:          self.email,
        email_verified: self.email_verified,
        account_owner:  Some(self.account_owner),
        locale:         self.locale,
        collaborator:   self.collaborator,
      }),
    });

    Ok(Session {
      id: self.id,
      shop: self.shop,
      state: self.state,
      is_online: self.is_online,
      scope: self.scope,
      expires,
      access_token: self.access_token,
      online_access_info,
    })
  }
}
