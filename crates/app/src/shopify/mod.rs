//! Shopify Admin API client and request verification.
//!
//! # Security
//!
//! The client is built per shop from that shop's stored offline session, so
//! every call carries the access token of the merchant it acts for. Nothing
//! is shared between shops except the underlying HTTP connection pool.
//!
//! # Architecture
//!
//! - Uses `graphql_client`'s `GraphQLQuery` contract for typed operations
//! - Direct API calls to Shopify (no local mirror of products or orders)
//! - Every request is bounded by the HTTP client timeout
//!
//! # Example
//!
//! ```rust,ignore
//! use processing_time_app::shopify::AdminConnector;
//!
//! let connector = AdminConnector::new(&config.shopify)?;
//! let client = connector.connect(&session)?;
//!
//! let assembly = client
//!     .get_metafield(&product, MetafieldKey::ASSEMBLY_TIME)
//!     .await?;
//! ```

mod admin;
pub mod hmac;

pub use admin::{AdminClient, AdminConnector, ORDER_PAGE_SIZE, OAuthToken};

use thiserror::Error;

/// Errors that can occur when interacting with Shopify Admin API.
#[derive(Debug, Error)]
pub enum AdminShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    /// The request did not complete within the configured timeout.
    #[error("Request timed out: {0}")]
    Timeout(reqwest::Error),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Authentication/authorization failed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User error from mutation (e.g., invalid input).
    #[error("User error: {0}")]
    UserError(String),

    /// The session has no access token yet.
    #[error("No access token for shop {0}")]
    NoAccessToken(String),

    /// The OAuth code exchange failed.
    #[error("OAuth error: {0}")]
    OAuth(String),
}

impl From<reqwest::Error> for AdminShopifyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err)
        } else {
            Self::Http(err)
        }
    }
}

/// A GraphQL error returned by the Shopify Admin API.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Source locations in the query.
    pub locations: Vec<GraphQLErrorLocation>,
    /// Path to the error in the response.
    pub path: Vec<serde_json::Value>,
}

impl GraphQLError {
    /// Create an error carrying only a message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: vec![],
            path: vec![],
        }
    }
}

/// Location in a GraphQL query where an error occurred.
#[derive(Debug, Clone)]
pub struct GraphQLErrorLocation {
    /// Line number (1-indexed).
    pub line: i64,
    /// Column number (1-indexed).
    pub column: i64,
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    errors
        .iter()
        .map(|e| e.message.clone())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_shopify_error_display() {
        let err = AdminShopifyError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");
    }

    #[test]
    fn test_graphql_error_formatting() {
        let errors = vec![
            GraphQLError::message("Field not found"),
            GraphQLError::message("Invalid ID"),
        ];
        let err = AdminShopifyError::GraphQL(errors);
        assert_eq!(
            err.to_string(),
            "GraphQL errors: Field not found; Invalid ID"
        );
    }

    #[test]
    fn test_rate_limited_error() {
        let err = AdminShopifyError::RateLimited(60);
        assert_eq!(err.to_string(), "Rate limited, retry after 60 seconds");
    }

    #[test]
    fn test_user_error() {
        let err = AdminShopifyError::UserError("Value must be an integer".to_string());
        assert_eq!(err.to_string(), "User error: Value must be an integer");
    }

    #[test]
    fn test_no_access_token_error() {
        let err = AdminShopifyError::NoAccessToken("acme.myshopify.com".to_string());
        assert_eq!(err.to_string(), "No access token for shop acme.myshopify.com");
    }
}
