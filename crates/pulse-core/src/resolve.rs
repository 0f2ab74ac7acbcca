//! Server-side identity resolution.

use tracing::{debug, warn};

use crate::{
  identity::{UserIdentity, merge_session},
  session::Session,
  shop::ShopInfoSource,
  store::SessionStore,
};

/// Resolve the identity of the user behind `session`.
///
/// Reads the persisted row for `session.id`, lets the session's own
/// online-access claims override it, and, when `email` or `first_name` is
/// still missing, asks `admin` for the shop's contact email. A failing
/// shop-info query is logged and ignored; only a store failure is returned.
pub async fn resolve_identity<S, A>(
  session: &Session,
  store:   &S,
  admin:   &A,
) -> Result<UserIdentity, S::Error>
where
  S: SessionStore,
  A: ShopInfoSource,
{
  let persisted = store.load_session(&session.id).await?;
  if persisted.is_none() {
    debug!(session_id = %session.id, "no persisted session row");
  }

  let mut identity = merge_session(persisted.as_ref(), session);

  if identity.needs_shop_fallback() {
    match admin.shop_info().await {
      Ok(Some(shop)) => {
        debug!(
          shop_id = shop.id.as_deref().unwrap_or_default(),
          domain = shop.myshopify_domain.as_deref().unwrap_or_default(),
          "fetched shop info"
        );
        identity.apply_shop_fallback(&shop);
      }
      Ok(None) => debug!("shop info query returned no shop"),
      Err(e) => warn!(error = %e, "error fetching shop info from admin api"),
    }
  }

  identity.recompute_full_name();
  Ok(identity)
}

#[cfg(test)]
mod tests {
  use std::{
    collections::HashMap,
    convert::Infallible,
    io,
    sync::{
      Mutex,
      atomic::{AtomicUsize, Ordering},
    },
  };

  use super::*;
  use crate::{
    session::{AssociatedUser, OnlineAccessInfo},
    shop::ShopInfo,
  };

  #[derive(Default)]
  struct MemoryStore {
    rows: Mutex<HashMap<String, Session>>,
  }

  impl MemoryStore {
    fn with(rows: impl IntoIterator<Item = Session>) -> Self {
      let store = Self::default();
      {
        let mut map = store.rows.lock().unwrap();
        for row in rows {
          map.insert(row.id.clone(), row);
        }
      }
      store
    }
  }

  impl SessionStore for MemoryStore {
    type Error = Infallible;
    async fn store_session(&self, s: &Session) -> Result<(), Self::Error> {
      self.rows.lock().unwrap().insert(s.id.clone(), s.clone());
      Ok(())
    }
    async fn load_session(&self, id: &str) -> Result<Option<Session>, Self::Error> {
      Ok(self.rows.lock().unwrap().get(id).cloned())
    }
    async fn delete_session(&self, id: &str) -> Result<bool, Self::Error> {
      Ok(self.rows.lock().unwrap().remove(id).is_some())
    }
    async fn delete_sessions(&self, ids: &[String]) -> Result<usize, Self::Error> {
      let mut map = self.rows.lock().unwrap();
      Ok(ids.iter().filter(|id| map.remove(*id).is_some()).count())
    }
    async fn find_sessions_by_shop(&self, shop: &str) -> Result<Vec<Session>, Self::Error> {
      Ok(self.rows.lock().unwrap().values().filter(|s| s.shop == shop).cloned().collect())
    }
  }

  /// Every read fails.
  struct FailingStore;

  impl SessionStore for FailingStore {
    type Error = io::Error;
    async fn store_session(&self, _: &Session) -> Result<(), Self::Error> {
      Err(io::Error::other("disk full"))
    }
    async fn load_session(&self, _: &str) -> Result<Option<Session>, Self::Error> {
      Err(io::Error::other("database is locked"))
    }
    async fn delete_session(&self, _: &str) -> Result<bool, Self::Error> {
      Err(io::Error::other("database is locked"))
    }
    async fn delete_sessions(&self, _: &[String]) -> Result<usize, Self::Error> {
      Err(io::Error::other("database is locked"))
    }
    async fn find_sessions_by_shop(&self, _: &str) -> Result<Vec<Session>, Self::Error> {
      Err(io::Error::other("database is locked"))
    }
  }

  enum Reply {
    Shop(Option<&'static str>),
    Missing,
    Fail,
  }

  struct FakeAdmin {
    reply: Reply,
    calls: AtomicUsize,
  }

  impl FakeAdmin {
    fn new(reply: Reply) -> Self { Self { reply, calls: AtomicUsize::new(0) } }
    fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
  }

  impl ShopInfoSource for FakeAdmin {
    type Error = io::Error;
    async fn shop_info(&self) -> Result<Option<ShopInfo>, Self::Error> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      match self.reply {
        Reply::Shop(email) => Ok(Some(ShopInfo {
          id:               Some("gid://shopify/Shop/1".into()),
          name:             Some("Demo".into()),
          email:            email.map(str::to_owned),
          myshopify_domain: Some("demo.myshopify.com".into()),
        })),
        Reply::Missing => Ok(None),
        Reply::Fail => Err(io::Error::other("connection reset")),
      }
    }
  }

  const SHOP: &str = "demo.myshopify.com";

  fn session(id: &str, user: Option<AssociatedUser>) -> Session {
    Session {
      id:                 id.into(),
      shop:               SHOP.into(),
      state:              "state".into(),
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

  fn full_user() -> AssociatedUser {
    AssociatedUser {
      id:         Some(1),
      email:      Some("stored@x.com".into()),
      first_name: Some("Stored".into()),
      last_name:  Some("User".into()),
      ..Default::default()
    }
  }

  #[tokio::test]
  async fn complete_identity_skips_remote_call() {
    let row = session("demo.myshopify.com_1", Some(full_user()));
    let store = MemoryStore::with([row.clone()]);
    let admin = FakeAdmin::new(Reply::Shop(Some("shop@x.com")));

    let identity = resolve_identity(&row, &store, &admin).await.unwrap();
    assert_eq!(admin.calls(), 0);
    assert_eq!(identity.email.as_deref(), Some("stored@x.com"));
    assert_eq!(identity.full_name.as_deref(), Some("Stored User"));
    assert_eq!(identity.shop.as_deref(), Some(SHOP));
  }

  #[tokio::test]
  async fn live_claims_beat_persisted_values() {
    let id = "demo.myshopify.com_1";
    let store = MemoryStore::with([session(id, Some(full_user()))]);
    let live = session(id, Some(AssociatedUser {
      first_name: Some("Fresh".into()),
      ..Default::default()
    }));
    let admin = FakeAdmin::new(Reply::Fail);

    let identity = resolve_identity(&live, &store, &admin).await.unwrap();
    assert_eq!(identity.first_name.as_deref(), Some("Fresh"));
    assert_eq!(identity.last_name.as_deref(), Some("User"));
    assert_eq!(identity.full_name.as_deref(), Some("Fresh User"));
    assert_eq!(admin.calls(), 0);
  }

  #[tokio::test]
  async fn missing_email_is_filled_from_shop() {
    let live = session("offline_demo.myshopify.com", None);
    let store = MemoryStore::with([live.clone()]);
    let admin = FakeAdmin::new(Reply::Shop(Some("shop@x.com")));

    let identity = resolve_identity(&live, &store, &admin).await.unwrap();
    assert_eq!(admin.calls(), 1);
    assert_eq!(identity.email.as_deref(), Some("shop@x.com"));
    assert!(identity.id.is_none());
    assert!(identity.full_name.is_none());
    assert_eq!(identity.shop.as_deref(), Some(SHOP));
  }

  #[tokio::test]
  async fn missing_first_name_queries_but_keeps_email() {
    let user = AssociatedUser { first_name: None, ..full_user() };
    let live = session("demo.myshopify.com_1", Some(user));
    let store = MemoryStore::with([live.clone()]);
    let admin = FakeAdmin::new(Reply::Shop(Some("shop@x.com")));

    let identity = resolve_identity(&live, &store, &admin).await.unwrap();
    assert_eq!(admin.calls(), 1);
    assert_eq!(identity.email.as_deref(), Some("stored@x.com"));
    assert_eq!(identity.full_name.as_deref(), Some("User"));
  }

  #[tokio::test]
  async fn failing_shop_query_is_swallowed() {
    let live = session("offline_demo.myshopify.com", None);
    let store = MemoryStore::with([live.clone()]);
    let admin = FakeAdmin::new(Reply::Fail);

    let identity = resolve_identity(&live, &store, &admin).await.unwrap();
    assert_eq!(admin.calls(), 1);
    assert_eq!(identity, UserIdentity {
      shop: Some(SHOP.into()),
      ..Default::default()
    });
  }

  #[tokio::test]
  async fn empty_shop_response_changes_nothing() {
    let live = session("offline_demo.myshopify.com", None);
    let store = MemoryStore::with([live.clone()]);
    let admin = FakeAdmin::new(Reply::Missing);

    let identity = resolve_identity(&live, &store, &admin).await.unwrap();
    assert!(identity.email.is_none());
  }

  #[tokio::test]
  async fn missing_row_leaves_only_claims() {
    let store = MemoryStore::default();
    let live = session("demo.myshopify.com_9", Some(AssociatedUser {
      id:    Some(9),
      email: Some("claims@x.com".into()),
      ..Default::default()
    }));
    let admin = FakeAdmin::new(Reply::Shop(Some("shop@x.com")));

    let identity = resolve_identity(&live, &store, &admin).await.unwrap();
    assert_eq!(identity.id.as_deref(), Some("9"));
    assert_eq!(identity.email.as_deref(), Some("claims@x.com"));
    // first_name is missing, so the query runs, but email is already set.
    assert_eq!(admin.calls(), 1);
    assert!(identity.shop.is_none());
  }

  #[tokio::test]
  async fn store_failure_reaches_caller_without_remote_call() {
    let live = session("offline_demo.myshopify.com", None);
    let admin = FakeAdmin::new(Reply::Shop(Some("shop@x.com")));

    let err = resolve_identity(&live, &FailingStore, &admin).await.unwrap_err();
    assert_eq!(err.to_string(), "database is locked");
    assert_eq!(admin.calls(), 0);
  }
}
