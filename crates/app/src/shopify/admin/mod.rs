//! Shopify Admin API GraphQL client with per-shop authentication.
//!
//! [`AdminConnector`] owns the shared HTTP client and app credentials and
//! hands out an [`AdminClient`] bound to one shop's access token.

use std::sync::Arc;
use std::time::Duration;

use graphql_client::GraphQLQuery;
use processing_time_core::ShopDomain;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::instrument;

use crate::config::ShopifyAppConfig;
use crate::models::ShopSession;

use super::{AdminShopifyError, GraphQLError, GraphQLErrorLocation};

mod metafields;
mod orders;
pub mod queries;
mod webhooks;

pub use orders::ORDER_PAGE_SIZE;

/// OAuth token returned by the code exchange.
#[derive(Clone, Serialize, Deserialize)]
pub struct OAuthToken {
    /// The access token for API calls
    pub access_token: String,
    /// Granted scopes
    pub scope: String,
    /// Unix timestamp when token was obtained
    pub obtained_at: i64,
    /// Associated shop domain
    pub shop: ShopDomain,
}

impl std::fmt::Debug for OAuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthToken")
            .field("access_token", &"[REDACTED]")
            .field("scope", &self.scope)
            .field("obtained_at", &self.obtained_at)
            .field("shop", &self.shop)
            .finish()
    }
}

/// Factory for per-shop Admin API clients.
///
/// Holds the pooled HTTP client (with the request timeout applied) and the
/// app credentials used for OAuth.
#[derive(Clone)]
pub struct AdminConnector {
    http: reqwest::Client,
    api_version: String,
    api_key: String,
    api_secret: SecretString,
}

impl AdminConnector {
    /// Create a connector from the app configuration.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ShopifyAppConfig) -> Result<Self, AdminShopifyError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            http,
            api_version: config.api_version.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        })
    }

    /// Build a client acting with the session's access token.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::NoAccessToken` if the session has not
    /// completed OAuth yet.
    pub fn connect(&self, session: &ShopSession) -> Result<AdminClient, AdminShopifyError> {
        let access_token = session
            .access_token
            .clone()
            .ok_or_else(|| AdminShopifyError::NoAccessToken(session.shop.to_string()))?;

        Ok(AdminClient {
            inner: Arc::new(AdminClientInner {
                client: self.http.clone(),
                shop: session.shop.clone(),
                api_version: self.api_version.clone(),
                access_token,
            }),
        })
    }

    // =========================================================================
    // OAuth Flow
    // =========================================================================

    /// Generate the OAuth authorization URL for a shop.
    ///
    /// Redirect the merchant to this URL to begin installation.
    #[must_use]
    pub fn authorization_url(
        &self,
        shop: &ShopDomain,
        redirect_uri: &str,
        scopes: &[&str],
        state: &str,
    ) -> String {
        let scope = scopes.join(",");
        format!(
            "https://{}/admin/oauth/authorize?client_id={}&scope={}&redirect_uri={}&state={}",
            shop,
            urlencoding::encode(&self.api_key),
            urlencoding::encode(&scope),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(state)
        )
    }

    /// Exchange an authorization code for an offline access token.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::OAuth` if the token exchange fails.
    /// Returns `AdminShopifyError::Http` if the HTTP request fails.
    #[instrument(skip(self, code), fields(shop = %shop))]
    pub async fn exchange_code(
        &self,
        shop: &ShopDomain,
        code: &str,
    ) -> Result<OAuthToken, AdminShopifyError> {
        let url = format!("https://{shop}/admin/oauth/access_token");

        let params = [
            ("client_id", self.api_key.as_str()),
            ("client_secret", self.api_secret.expose_secret()),
            ("code", code),
        ];

        let response = self.http.post(&url).form(&params).send().await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AdminShopifyError::OAuth(format!(
                "Token exchange failed: {text}"
            )));
        }

        let token_response: OAuthTokenResponse = serde_json::from_slice(&response.bytes().await?)?;

        Ok(OAuthToken {
            access_token: token_response.access_token,
            scope: token_response.scope,
            obtained_at: chrono::Utc::now().timestamp(),
            shop: shop.clone(),
        })
    }
}

/// Shopify Admin API GraphQL client bound to one shop.
///
/// Cheap to clone; all clones share the HTTP connection pool.
#[derive(Clone)]
pub struct AdminClient {
    inner: Arc<AdminClientInner>,
}

struct AdminClientInner {
    client: reqwest::Client,
    shop: ShopDomain,
    api_version: String,
    access_token: SecretString,
}

/// GraphQL response wrapper.
#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLErrorResponse>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorResponse {
    message: String,
    #[serde(default)]
    locations: Vec<GraphQLErrorLocationResponse>,
    #[serde(default)]
    path: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorLocationResponse {
    line: i64,
    column: i64,
}

/// OAuth token response from Shopify.
#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
    scope: String,
}

impl AdminClient {
    /// Get the shop this client acts for.
    #[must_use]
    pub fn shop(&self) -> &ShopDomain {
        &self.inner.shop
    }

    fn endpoint(&self) -> String {
        format!(
            "https://{}/admin/api/{}/graphql.json",
            self.inner.shop, self.inner.api_version
        )
    }

    // =========================================================================
    // GraphQL Execution
    // =========================================================================

    /// Execute a GraphQL operation.
    async fn execute<Q: GraphQLQuery>(
        &self,
        variables: Q::Variables,
    ) -> Result<Q::ResponseData, AdminShopifyError>
    where
        Q::ResponseData: DeserializeOwned,
    {
        let body = Q::build_query(variables);

        let response = self
            .inner
            .client
            .post(self.endpoint())
            .header("X-Shopify-Access-Token", self.inner.access_token.expose_secret())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        // Check for rate limiting
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<f64>().ok())
                .map_or(60, |secs| secs.ceil() as u64);
            return Err(AdminShopifyError::RateLimited(retry_after));
        }

        // Check for unauthorized
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AdminShopifyError::Unauthorized(
                "Invalid or expired access token".to_string(),
            ));
        }

        let bytes = response.error_for_status()?.bytes().await?;
        parse_graphql_response(&bytes)
    }
}

/// Decode a GraphQL response body, surfacing top-level errors.
fn parse_graphql_response<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, AdminShopifyError> {
    let graphql_response: GraphQLResponse<T> = serde_json::from_slice(bytes)?;

    // Check for GraphQL errors
    if let Some(errors) = graphql_response.errors
        && !errors.is_empty()
    {
        let converted_errors: Vec<GraphQLError> = errors
            .into_iter()
            .map(|e| GraphQLError {
                message: e.message,
                locations: e
                    .locations
                    .into_iter()
                    .map(|l| GraphQLErrorLocation {
                        line: l.line,
                        column: l.column,
                    })
                    .collect(),
                path: e.path,
            })
            .collect();
        return Err(AdminShopifyError::GraphQL(converted_errors));
    }

    graphql_response
        .data
        .ok_or_else(|| AdminShopifyError::GraphQL(vec![GraphQLError::message("No data in response")]))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn connector() -> AdminConnector {
        AdminConnector::new(&ShopifyAppConfig {
            api_key: "test_api_key".to_string(),
            api_secret: SecretString::from("test_api_secret"),
            api_version: "2024-07".to_string(),
            app_url: "https://app.example.com".to_string(),
            request_timeout: Duration::from_secs(10),
        })
        .unwrap()
    }

    fn session(access_token: Option<&str>) -> ShopSession {
        let shop = ShopDomain::parse("acme.myshopify.com").unwrap();
        ShopSession {
            id: shop.offline_session_id(),
            shop,
            state: "state".to_string(),
            is_online: false,
            scope: None,
            expires: None,
            access_token: access_token.map(SecretString::from),
        }
    }

    #[test]
    fn test_authorization_url() {
        let shop = ShopDomain::parse("acme.myshopify.com").unwrap();
        let url = connector().authorization_url(
            &shop,
            "https://app.example.com/auth/callback",
            &["read_orders", "write_products"],
            "nonce",
        );
        assert!(url.starts_with("https://acme.myshopify.com/admin/oauth/authorize?"));
        assert!(url.contains("client_id=test_api_key"));
        assert!(url.contains("scope=read_orders%2Cwrite_products"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fapp.example.com%2Fauth%2Fcallback"));
        assert!(url.ends_with("state=nonce"));
    }

    #[test]
    fn test_connect_requires_access_token() {
        let err = connector().connect(&session(None)).err().unwrap();
        assert!(matches!(err, AdminShopifyError::NoAccessToken(_)));
    }

    #[test]
    fn test_connect_builds_endpoint() {
        let client = connector().connect(&session(Some("shpat_x"))).unwrap();
        assert_eq!(client.shop().as_str(), "acme.myshopify.com");
        assert_eq!(
            client.endpoint(),
            "https://acme.myshopify.com/admin/api/2024-07/graphql.json"
        );
    }

    #[test]
    fn test_parse_graphql_response_data() {
        let data: serde_json::Value =
            parse_graphql_response(br#"{"data": {"product": null}}"#).unwrap();
        assert!(data["product"].is_null());
    }

    #[test]
    fn test_parse_graphql_response_errors() {
        let err = parse_graphql_response::<serde_json::Value>(
            br#"{"data": null, "errors": [{"message": "Throttled", "locations": [{"line": 2, "column": 3}]}]}"#,
        )
        .unwrap_err();
        match err {
            AdminShopifyError::GraphQL(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors.first().unwrap().message, "Throttled");
                assert_eq!(errors.first().unwrap().locations.first().unwrap().line, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_graphql_response_missing_data() {
        let err = parse_graphql_response::<serde_json::Value>(br"{}").unwrap_err();
        assert!(err.to_string().contains("No data in response"));
    }

    #[test]
    fn test_parse_graphql_response_invalid_json() {
        let err = parse_graphql_response::<serde_json::Value>(b"<html>").unwrap_err();
        assert!(matches!(err, AdminShopifyError::Parse(_)));
    }
}
