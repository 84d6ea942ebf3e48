//! Shared setup for commands acting on one shop.
//!
//! # Environment Variables
//!
//! Everything `processing-time-app` reads: `DATABASE_URL`,
//! `SHOPIFY_API_KEY`, `SHOPIFY_API_SECRET`, `SHOPIFY_APP_URL` and the
//! optional settings.

use processing_time_app::config::{AppConfig, ConfigError};
use processing_time_app::db::{RepositoryError, SessionRepository, SessionStore, create_pool};
use processing_time_app::models::ShopSession;
use processing_time_app::services::RecomputeError;
use processing_time_app::shopify::{AdminClient, AdminConnector, AdminShopifyError};
use processing_time_core::{ProductRef, ShopDomain};
use thiserror::Error;

/// Errors that can occur in shop commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Session lookup failed: {0}")]
    Sessions(#[from] RepositoryError),

    #[error("Shopify error: {0}")]
    Shopify(#[from] AdminShopifyError),

    #[error("Recomputation failed: {0}")]
    Recompute(#[from] RecomputeError),

    #[error("Invalid {0}: {1}")]
    InvalidArgument(&'static str, String),

    #[error("{0} has no active session; install the app first")]
    NotInstalled(ShopDomain),
}

/// Configuration and an Admin API client for one installed shop.
pub struct ShopContext {
    pub config: AppConfig,
    pub client: AdminClient,
}

/// Load configuration and connect to `shop` with its stored session.
///
/// # Errors
///
/// Returns `CommandError` if configuration is invalid, the database is
/// unreachable, or the shop has no session with an access token.
pub async fn connect(shop: &str) -> Result<ShopContext, CommandError> {
    let shop = ShopDomain::parse(shop)
        .map_err(|e| CommandError::InvalidArgument("shop", e.to_string()))?;
    let config = AppConfig::from_env()?;

    tracing::info!("Connecting to database...");
    let pool = create_pool(&config.database_url).await?;
    let session = SessionRepository::new(pool)
        .find_by_shop(&shop)
        .await?
        .filter(ShopSession::is_active)
        .ok_or_else(|| CommandError::NotInstalled(shop.clone()))?;

    let client = AdminConnector::new(&config.shopify)?.connect(&session)?;
    Ok(ShopContext { config, client })
}

/// Parse a product given as a numeric id or a global id.
///
/// # Errors
///
/// Returns `CommandError::InvalidArgument` for anything else.
pub fn parse_product(product: &str) -> Result<ProductRef, CommandError> {
    let product = product.trim();
    match product.parse::<u64>() {
        Ok(id) if id > 0 => Ok(ProductRef::from_legacy_id(id)),
        Ok(_) => Err(CommandError::InvalidArgument(
            "product",
            "id must be positive".to_string(),
        )),
        Err(_) => ProductRef::parse(product)
            .map_err(|e| CommandError::InvalidArgument("product", e.to_string())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_product() {
        assert_eq!(parse_product("632910392").unwrap().numeric_id(), 632_910_392);
        assert_eq!(
            parse_product("gid://shopify/Product/7").unwrap(),
            ProductRef::from_legacy_id(7)
        );
        assert!(parse_product("0").is_err());
        assert!(parse_product("gid://shopify/Order/7").is_err());
        assert!(parse_product("chair").is_err());
    }
}
