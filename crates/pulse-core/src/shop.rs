//! Shop-level information fetched from the Admin API.

use std::future::Future;

use serde::{Deserialize, Serialize};

/// GraphQL document issued for the email fallback.
pub const SHOP_INFO_QUERY: &str = "query {
  shop {
    id
    name
    email
    myshopifyDomain
  }
}";

/// The `shop` object returned by [`SHOP_INFO_QUERY`].
///
/// Only `email` takes part in identity resolution; the rest is kept for
/// logging and for callers that want it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopInfo {
  #[serde(default)]
  pub id:               Option<String>,
  #[serde(default)]
  pub name:             Option<String>,
  #[serde(default)]
  pub email:            Option<String>,
  #[serde(default)]
  pub myshopify_domain: Option<String>,
}

/// Anything that can answer [`SHOP_INFO_QUERY`] for the authenticated shop.
///
/// Implemented by the Admin API client in `pulse-admin`; tests use fakes.
pub trait ShopInfoSource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// `Ok(None)` means the query succeeded but returned no `shop` object.
  fn shop_info(
    &self,
  ) -> impl Future<Output = Result<Option<ShopInfo>, Self::Error>> + Send + '_;
}
