//! Sessions: the authenticated handles the platform issues for a shop.
//!
//! Offline sessions carry a long-lived shop-level token. Online sessions
//! carry a short-lived per-user token and, with it, the claims describing
//! the user that token was issued to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Online access ───────────────────────────────────────────────────────────

/// The user an online access token was issued to.
///
/// Every field is optional: claims arrive from the platform as loosely typed
/// JSON and are consumed field by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociatedUser {
  #[serde(default)]
  pub id:             Option<i64>,
  #[serde(default)]
  pub first_name:     Option<String>,
  #[serde(default)]
  pub last_name:      Option<String>,
  #[serde(default)]
  pub email:          Option<String>,
  #[serde(default)]
  pub email_verified: Option<bool>,
  #[serde(default)]
  pub account_owner:  Option<bool>,
  #[serde(default)]
  pub locale:         Option<String>,
  #[serde(default)]
  pub collaborator:   Option<bool>,
}

/// Inline claims attached to a session established with an online token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineAccessInfo {
  #[serde(default)]
  pub expires_in:            Option<i64>,
  #[serde(default)]
  pub associated_user_scope: Option<String>,
  #[serde(default)]
  pub associated_user:       Option<AssociatedUser>,
}

// ─── Session ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
  pub id:                 String,
  pub shop:               String,
  pub state:              String,
  pub is_online:          bool,
  pub scope:              Option<String>,
  pub expires:            Option<DateTime<Utc>>,
  pub access_token:       String,
  pub online_access_info: Option<OnlineAccessInfo>,
}

impl Session {
  /// Id of the shop-level session for `shop`.
  pub fn offline_id(shop: &str) -> String { format!("offline_{shop}") }

  /// Id of the per-user session for `user_id` on `shop`.
  pub fn online_id(shop: &str, user_id: i64) -> String {
    format!("{shop}_{user_id}")
  }

  /// The associated user of the online-access claims, if any.
  pub fn associated_user(&self) -> Option<&AssociatedUser> {
    self
      .online_access_info
      .as_ref()
      .and_then(|info| info.associated_user.as_ref())
  }

  /// A session without an expiry never expires.
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
    self.expires.is_some_and(|at| at <= now)
  }
}

// ─── Shop domains ────────────────────────────────────────────────────────────

/// Normalise a shop reference to its bare `*.myshopify.com` host.
///
/// Accepts either a bare host or a URL such as the `dest` claim of a session
/// token (`https://example.myshopify.com`).
pub fn sanitize_shop(raw: &str) -> Result<String> {
  let trimmed = raw.trim();
  let without_scheme = trimmed
    .strip_prefix("https://")
    .or_else(|| trimmed.strip_prefix("http://"))
    .unwrap_or(trimmed);
  let host = without_scheme
    .split('/')
    .next()
    .unwrap_or_default()
    .to_ascii_lowercase();

  let valid = host.ends_with(".myshopify.com")
    && host.len() > ".myshopify.com".len()
    && host
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');

  if valid {
    Ok(host)
  } else {
    Err(Error::InvalidShopDomain(raw.to_owned()))
  }
}
