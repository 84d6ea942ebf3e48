//! Webhook subscription command.
//!
//! # Usage
//!
//! ```bash
//! pt-cli webhooks register -s demo.myshopify.com
//! ```

use super::shop::{CommandError, connect};

/// Create the app's webhook subscriptions for a shop.
///
/// Topics Shopify rejects, including ones already subscribed, are logged
/// and skipped.
///
/// # Errors
///
/// Returns `CommandError` if the shop cannot be reached.
pub async fn register(shop: &str) -> Result<(), CommandError> {
    let ctx = connect(shop).await?;
    let callback_url = ctx.config.shopify.webhook_url();

    let registered = ctx.client.register_webhooks(&callback_url).await;

    tracing::info!(registered, callback_url = %callback_url, "Webhook subscriptions registered");
    Ok(())
}
