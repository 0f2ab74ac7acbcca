//! `UserIdentity`, the normalised view of "who is using the app right now".
//!
//! An identity is assembled per request from up to three sources, in
//! increasing precedence for each field:
//!
//! 1. the persisted session row,
//! 2. the online-access claims of the live session,
//! 3. the shop's contact email, which may only fill a missing `email`.
//!
//! `full_name` is always derived from `first_name` and `last_name` and is
//! recomputed after every merge step.

use serde::{Deserialize, Serialize};

use crate::{
  session::{AssociatedUser, Session},
  shop::ShopInfo,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
  pub id:         Option<String>,
  pub email:      Option<String>,
  pub first_name: Option<String>,
  pub last_name:  Option<String>,
  pub full_name:  Option<String>,
  pub shop:       Option<String>,
}

/// `"{first} {last}"` with surrounding whitespace trimmed, or `None` if
/// nothing is left.
pub fn full_name(first: Option<&str>, last: Option<&str>) -> Option<String> {
  let joined = format!("{} {}", first.unwrap_or_default(), last.unwrap_or_default());
  present(Some(joined.trim()))
}

/// Empty strings count as absent.
pub(crate) fn present(value: Option<&str>) -> Option<String> {
  value.filter(|v| !v.is_empty()).map(str::to_owned)
}

impl UserIdentity {
  /// Seed an identity from the persisted session row. A missing row yields
  /// an identity with every field unset.
  pub fn from_persisted(row: Option<&Session>) -> Self {
    let Some(row) = row else {
      return Self::default();
    };
    let user = row.associated_user();

    Self {
      id:         user.and_then(|u| u.id).map(|id| id.to_string()),
      email:      present(user.and_then(|u| u.email.as_deref())),
      first_name: present(user.and_then(|u| u.first_name.as_deref())),
      last_name:  present(user.and_then(|u| u.last_name.as_deref())),
      full_name:  None,
      shop:       present(Some(&row.shop)),
    }
  }

  /// Override fields with the online-access claims. A claim field only wins
  /// when it is present; `shop` is never taken from claims.
  pub fn apply_claims(&mut self, claims: &AssociatedUser) {
    if let Some(id) = claims.id {
      self.id = Some(id.to_string());
    }
    if let Some(email) = present(claims.email.as_deref()) {
      self.email = Some(email);
    }
    if let Some(first) = present(claims.first_name.as_deref()) {
      self.first_name = Some(first);
    }
    if let Some(last) = present(claims.last_name.as_deref()) {
      self.last_name = Some(last);
    }
    self.full_name = None;
  }

  /// Whether the shop-info fallback query is worth issuing.
  pub fn needs_shop_fallback(&self) -> bool {
    self.email.is_none() || self.first_name.is_none()
  }

  /// Fill a still-missing `email` from the shop's contact email. Nothing
  /// else on [`ShopInfo`] is consumed.
  pub fn apply_shop_fallback(&mut self, shop: &ShopInfo) {
    if self.email.is_none() {
      self.email = present(shop.email.as_deref());
    }
  }

  pub fn recompute_full_name(&mut self) {
    self.full_name =
      full_name(self.first_name.as_deref(), self.last_name.as_deref());
  }

  /// Both `id` and `email` are known.
  pub fn is_complete(&self) -> bool {
    self.id.is_some() && self.email.is_some()
  }
}

/// Seed from the persisted row and let the live session's claims override
/// it. `full_name` is left unset; callers recompute it once every source,
/// including the shop fallback, has been applied.
pub fn merge_session(persisted: Option<&Session>, live: &Session) -> UserIdentity {
  let mut identity = UserIdentity::from_persisted(persisted);
  if let Some(claims) = live.associated_user() {
    identity.apply_claims(claims);
  }
  identity
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::session::OnlineAccessInfo;

  fn row(user: Option<AssociatedUser>) -> Session {
    Session {
      id:                 "demo.myshopify.com_1".into(),
      shop:               "demo.myshopify.com".into(),
      state:              "s".into(),
      is_online:          user.is_some(),
      scope:              None,
      expires:            None,
      access_token:       "tok".into(),
      online_access_info: user.map(|u| OnlineAccessInfo {
        associated_user: Some(u),
        ..Default::default()
      }),
    }
  }

  fn stored_user() -> AssociatedUser {
    AssociatedUser {
      id:         Some(1),
      email:      Some("stored@example.com".into()),
      first_name: Some("Stored".into()),
      last_name:  Some("User".into()),
      ..Default::default()
    }
  }

  // ─── full_name ──────────────────────────────────────────────────────────

  #[test]
  fn full_name_joins_with_single_space() {
    assert_eq!(full_name(Some("Ada"), Some("Lovelace")).as_deref(), Some("Ada Lovelace"));
  }

  #[test]
  fn full_name_trims_when_one_side_missing() {
    assert_eq!(full_name(Some("Ada"), None).as_deref(), Some("Ada"));
    assert_eq!(full_name(None, Some("Lovelace")).as_deref(), Some("Lovelace"));
    assert_eq!(full_name(Some(""), Some("Lovelace")).as_deref(), Some("Lovelace"));
  }

  #[test]
  fn full_name_is_none_when_empty() {
    assert_eq!(full_name(None, None), None);
    assert_eq!(full_name(Some(" "), Some("")), None);
  }

  // ─── persisted seed ─────────────────────────────────────────────────────

  #[test]
  fn missing_row_yields_empty_identity() {
    assert_eq!(UserIdentity::from_persisted(None), UserIdentity::default());
  }

  #[test]
  fn persisted_row_seeds_all_fields_but_full_name() {
    let identity = UserIdentity::from_persisted(Some(&row(Some(stored_user()))));
    assert_eq!(identity.id.as_deref(), Some("1"));
    assert_eq!(identity.email.as_deref(), Some("stored@example.com"));
    assert_eq!(identity.first_name.as_deref(), Some("Stored"));
    assert_eq!(identity.last_name.as_deref(), Some("User"));
    assert_eq!(identity.shop.as_deref(), Some("demo.myshopify.com"));
    assert!(identity.full_name.is_none());
  }

  #[test]
  fn empty_persisted_strings_count_as_absent() {
    let user = AssociatedUser { email: Some(String::new()), ..stored_user() };
    let identity = UserIdentity::from_persisted(Some(&row(Some(user))));
    assert!(identity.email.is_none());
  }

  // ─── claims precedence ──────────────────────────────────────────────────

  fn merged(persisted: Option<&Session>, live: &Session) -> UserIdentity {
    let mut identity = merge_session(persisted, live);
    identity.recompute_full_name();
    identity
  }

  #[test]
  fn merge_leaves_full_name_for_the_caller() {
    let persisted = row(Some(stored_user()));
    assert!(merge_session(Some(&persisted), &persisted).full_name.is_none());
  }

  #[test]
  fn claims_override_field_by_field() {
    let persisted = row(Some(stored_user()));
    let live = row(Some(AssociatedUser {
      id:    Some(99),
      email: Some("claims@example.com".into()),
      ..Default::default()
    }));

    let identity = merged(Some(&persisted), &live);
    assert_eq!(identity.id.as_deref(), Some("99"));
    assert_eq!(identity.email.as_deref(), Some("claims@example.com"));
    // Absent claim fields keep the persisted value.
    assert_eq!(identity.first_name.as_deref(), Some("Stored"));
    assert_eq!(identity.last_name.as_deref(), Some("User"));
    assert_eq!(identity.full_name.as_deref(), Some("Stored User"));
    assert_eq!(identity.shop.as_deref(), Some("demo.myshopify.com"));
  }

  #[test]
  fn without_claims_identity_equals_persisted_values() {
    let persisted = row(Some(stored_user()));
    let live = row(None);

    let identity = merged(Some(&persisted), &live);
    assert_eq!(identity, UserIdentity {
      id:         Some("1".into()),
      email:      Some("stored@example.com".into()),
      first_name: Some("Stored".into()),
      last_name:  Some("User".into()),
      full_name:  Some("Stored User".into()),
      shop:       Some("demo.myshopify.com".into()),
    });
  }

  #[test]
  fn claims_apply_even_without_persisted_row() {
    let live = row(Some(AssociatedUser {
      id:         Some(5),
      first_name: Some("Only".into()),
      ..Default::default()
    }));
    let identity = merged(None, &live);
    assert_eq!(identity.id.as_deref(), Some("5"));
    assert_eq!(identity.full_name.as_deref(), Some("Only"));
    assert!(identity.shop.is_none());
  }

  // ─── shop fallback ──────────────────────────────────────────────────────

  fn shop(email: Option<&str>) -> ShopInfo {
    ShopInfo {
      id:               Some("gid://shopify/Shop/1".into()),
      name:             Some("Demo".into()),
      email:            email.map(str::to_owned),
      myshopify_domain: Some("demo.myshopify.com".into()),
    }
  }

  #[test]
  fn fallback_needed_when_email_or_first_name_missing() {
    let mut identity = UserIdentity {
      email:      Some("a@x.com".into()),
      first_name: Some("A".into()),
      ..Default::default()
    };
    assert!(!identity.needs_shop_fallback());
    identity.first_name = None;
    assert!(identity.needs_shop_fallback());
  }

  #[test]
  fn fallback_fills_missing_email_only() {
    let mut identity = UserIdentity::default();
    identity.apply_shop_fallback(&shop(Some("shop@x.com")));
    assert_eq!(identity.email.as_deref(), Some("shop@x.com"));
    assert!(identity.shop.is_none());
    assert!(identity.first_name.is_none());
  }

  #[test]
  fn fallback_never_replaces_existing_email() {
    let mut identity = UserIdentity {
      email: Some("user@x.com".into()),
      ..Default::default()
    };
    identity.apply_shop_fallback(&shop(Some("shop@x.com")));
    assert_eq!(identity.email.as_deref(), Some("user@x.com"));
  }

  #[test]
  fn serializes_camel_case_with_nulls() {
    let json = serde_json::to_value(UserIdentity {
      first_name: Some("A".into()),
      ..Default::default()
    })
    .unwrap();
    assert_eq!(json["firstName"], "A");
    assert!(json["fullName"].is_null());
    assert!(json["id"].is_null());
  }
}
