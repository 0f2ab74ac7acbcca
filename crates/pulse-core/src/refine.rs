//! Client-side identity refinement.
//!
//! A page renders immediately with the identity the server resolved. In the
//! background it may ask the host's bridge for the current user; when that
//! answer arrives and the server identity was incomplete, the bridge user
//! replaces it. [`IdentityView`] holds both inputs and re-derives the
//! displayed identity whenever either changes.

use std::{future::Future, sync::Arc};

use serde::{Deserialize, Deserializer, Serialize};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, warn};

use crate::{
  Result,
  identity::{UserIdentity, full_name, present},
};

// ─── Bridge user ─────────────────────────────────────────────────────────────

/// The user record reported by the bridge. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeUser {
  #[serde(default, deserialize_with = "string_or_number")]
  pub id:         Option<String>,
  #[serde(default)]
  pub email:      Option<String>,
  #[serde(default)]
  pub first_name: Option<String>,
  #[serde(default)]
  pub last_name:  Option<String>,
}

/// Bridges report numeric ids on some hosts and string ids on others.
fn string_or_number<'de, D>(d: D) -> std::result::Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum RawId {
    Text(String),
    Number(i64),
  }

  Ok(Option::<RawId>::deserialize(d)?.map(|raw| match raw {
    RawId::Text(s) => s,
    RawId::Number(n) => n.to_string(),
  }))
}

impl BridgeUser {
  pub fn from_json(raw: &str) -> Result<Self> { Ok(serde_json::from_str(raw)?) }

  /// Build a full identity from the bridge fields, keeping `shop`.
  pub fn to_identity(&self, shop: Option<&str>) -> UserIdentity {
    UserIdentity {
      id:         present(self.id.as_deref()),
      email:      present(self.email.as_deref()),
      first_name: present(self.first_name.as_deref()),
      last_name:  present(self.last_name.as_deref()),
      full_name:  full_name(self.first_name.as_deref(), self.last_name.as_deref()),
      shop:       present(shop),
    }
  }
}

/// A bridge that can report the currently signed-in user.
pub trait BridgeUserSource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn current_user(
    &self,
  ) -> impl Future<Output = std::result::Result<BridgeUser, Self::Error>> + Send + '_;
}

// ─── Derivation ──────────────────────────────────────────────────────────────

/// The identity to display for `server` given the bridge result so far.
///
/// A complete server identity (both `id` and `email`) always wins. Otherwise
/// a bridge user, once known, replaces it wholesale; there is no
/// field-level merge at this stage.
pub fn refine(server: &UserIdentity, bridge: Option<&BridgeUser>) -> UserIdentity {
  if server.is_complete() {
    return server.clone();
  }
  match bridge {
    Some(user) => user.to_identity(server.shop.as_deref()),
    None => server.clone(),
  }
}

// ─── View ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
struct Inputs {
  server: UserIdentity,
  bridge: Option<BridgeUser>,
}

/// Reactive holder for the displayed identity.
///
/// Subscribers receive a new value only when the derived identity actually
/// changes.
pub struct IdentityView {
  inputs:    watch::Sender<Inputs>,
  displayed: watch::Sender<UserIdentity>,
}

impl IdentityView {
  pub fn new(server: UserIdentity) -> Arc<Self> {
    let displayed = refine(&server, None);
    Arc::new(Self {
      inputs:    watch::Sender::new(Inputs { server, bridge: None }),
      displayed: watch::Sender::new(displayed),
    })
  }

  /// The identity to render right now.
  pub fn current(&self) -> UserIdentity { self.displayed.borrow().clone() }

  pub fn subscribe(&self) -> watch::Receiver<UserIdentity> {
    self.displayed.subscribe()
  }

  pub fn set_server(&self, server: UserIdentity) {
    self.inputs.send_modify(|inputs| inputs.server = server);
    self.recompute();
  }

  pub fn set_bridge_user(&self, user: BridgeUser) {
    self.inputs.send_modify(|inputs| inputs.bridge = Some(user));
    self.recompute();
  }

  fn recompute(&self) {
    let next = {
      let inputs = self.inputs.borrow();
      refine(&inputs.server, inputs.bridge.as_ref())
    };
    self.displayed.send_if_modified(|current| {
      if *current == next {
        false
      } else {
        *current = next;
        true
      }
    });
  }

  /// Ask `bridge` for the current user in the background.
  ///
  /// Returns `None` without spawning when no bridge with a user capability
  /// is available. A failed lookup is logged and leaves the view unchanged.
  pub fn spawn_bridge_lookup<B>(self: &Arc<Self>, bridge: Option<B>) -> Option<JoinHandle<()>>
  where
    B: BridgeUserSource + 'static,
  {
    let bridge = bridge?;
    let view = Arc::clone(self);
    Some(tokio::spawn(async move {
      match bridge.current_user().await {
        Ok(user) => {
          debug!(user_id = user.id.as_deref().unwrap_or_default(), "bridge user");
          view.set_bridge_user(user);
        }
        Err(e) => warn!(error = %e, "could not get user from bridge"),
      }
    }))
  }
}
