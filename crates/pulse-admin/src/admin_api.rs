//! Async GraphQL client for the platform's Admin API.

use std::time::Duration;

use pulse_core::shop::{SHOP_INFO_QUERY, ShopInfo, ShopInfoSource};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;
use thiserror::Error;

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

#[derive(Debug, Error)]
pub enum AdminApiError {
  #[error("request failed: {0}")]
  Http(#[from] reqwest::Error),
  #[error("admin api returned {status}: {body}")]
  Status { status: StatusCode, body: String },
  #[error("graphql errors: {0}")]
  GraphQl(String),
}

/// Build the shared HTTP client. Cheap to clone; the inner client is
/// `Arc`-based.
pub fn http_client() -> reqwest::Result<Client> {
  Client::builder().timeout(Duration::from_secs(30)).build()
}

/// Admin API client bound to one shop and one access token.
#[derive(Clone)]
pub struct AdminApiClient {
  client:       Client,
  endpoint:     String,
  access_token: String,
}

#[derive(Deserialize)]
struct GraphQlResponse<T> {
  data:   Option<T>,
  #[serde(default)]
  errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
  message: String,
}

#[derive(Deserialize)]
struct ShopData {
  shop: Option<ShopInfo>,
}

impl AdminApiClient {
  /// `origin` overrides `https://{shop}`, e.g. to point at a local proxy.
  pub fn new(
    client:       Client,
    origin:       Option<&str>,
    api_version:  &str,
    shop:         &str,
    access_token: &str,
  ) -> Self {
    let origin = origin
      .map(|o| o.trim_end_matches('/').to_owned())
      .unwrap_or_else(|| format!("https://{shop}"));
    Self {
      client,
      endpoint: format!("{origin}/admin/api/{api_version}/graphql.json"),
      access_token: access_token.to_owned(),
    }
  }

  pub fn endpoint(&self) -> &str { &self.endpoint }

  /// POST a GraphQL document and decode its `data`.
  ///
  /// A non-empty `errors` array is an error even when `data` is present.
  pub async fn graphql<T: DeserializeOwned>(
    &self,
    query: &str,
  ) -> Result<Option<T>, AdminApiError> {
    let resp = self
      .client
      .post(&self.endpoint)
      .header(ACCESS_TOKEN_HEADER, &self.access_token)
      .json(&json!({ "query": query }))
      .send()
      .await?;

    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      return Err(AdminApiError::Status { status, body });
    }

    let body: GraphQlResponse<T> = resp.json().await?;
    if !body.errors.is_empty() {
      let messages: Vec<_> =
        body.errors.into_iter().map(|e| e.message).collect();
      return Err(AdminApiError::GraphQl(messages.join("; ")));
    }
    Ok(body.data)
  }
}

impl ShopInfoSource for AdminApiClient {
  type Error = AdminApiError;

  async fn shop_info(&self) -> Result<Option<ShopInfo>, AdminApiError> {
    let data: Option<ShopData> = self.graphql(SHOP_INFO_QUERY).await?;
    Ok(data.and_then(|d| d.shop))
  }
}

#[cfg(test)]
mod tests {
  use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode},
    routing::post,
  };
  use serde_json::Value;
  use tokio::net::TcpListener;

  use super::*;

  /// Serve `app` on an ephemeral port and return its origin.
  async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}")
  }

  fn client(origin: &str) -> AdminApiClient {
    AdminApiClient::new(
      http_client().unwrap(),
      Some(origin),
      "2025-10",
      "demo.myshopify.com",
      "shpat_test",
    )
  }

  #[test]
  fn endpoint_defaults_to_shop_host() {
    let c = AdminApiClient::new(
      http_client().unwrap(),
      None,
      "2025-10",
      "demo.myshopify.com",
      "t",
    );
    assert_eq!(
      c.endpoint(),
      "https://demo.myshopify.com/admin/api/2025-10/graphql.json"
    );
  }

  #[tokio::test]
  async fn shop_info_sends_token_and_decodes_shop() {
    async fn handler(headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
      assert_eq!(headers.get(ACCESS_TOKEN_HEADER).unwrap(), "shpat_test");
      assert!(body["query"].as_str().unwrap().contains("myshopifyDomain"));
      Json(json!({
        "data": { "shop": {
          "id": "gid://shopify/Shop/1",
          "name": "Demo",
          "email": "owner@demo.com",
          "myshopifyDomain": "demo.myshopify.com"
        }}
      }))
    }
    let origin =
      serve(Router::new().route("/admin/api/2025-10/graphql.json", post(handler))).await;

    let shop = client(&origin).shop_info().await.unwrap().unwrap();
    assert_eq!(shop.email.as_deref(), Some("owner@demo.com"));
    assert_eq!(shop.myshopify_domain.as_deref(), Some("demo.myshopify.com"));
  }

  #[tokio::test]
  async fn missing_data_is_not_an_error() {
    let origin = serve(Router::new().route(
      "/admin/api/2025-10/graphql.json",
      post(|| async { Json(json!({})) }),
    ))
    .await;
    assert!(client(&origin).shop_info().await.unwrap().is_none());
  }

  #[tokio::test]
  async fn graphql_errors_are_reported() {
    let origin = serve(Router::new().route(
      "/admin/api/2025-10/graphql.json",
      post(|| async {
        Json(json!({ "data": null, "errors": [{ "message": "Access denied" }] }))
      }),
    ))
    .await;
    let err = client(&origin).shop_info().await.unwrap_err();
    assert!(matches!(err, AdminApiError::GraphQl(ref m) if m == "Access denied"));
  }

  #[tokio::test]
  async fn http_status_is_reported() {
    let origin = serve(Router::new().route(
      "/admin/api/2025-10/graphql.json",
      post(|| async { (StatusCode::UNAUTHORIZED, "bad token") }),
    ))
    .await;
    let err = client(&origin).shop_info().await.unwrap_err();
    assert!(matches!(
      err,
      AdminApiError::Status { status: StatusCode::UNAUTHORIZED, .. }
    ));
  }
}
