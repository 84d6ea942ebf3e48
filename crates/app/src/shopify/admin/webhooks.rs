//! Webhook subscription management for the Admin API.

use processing_time_core::WebhookTopic;
use tracing::{info, instrument, warn};

use super::{
    AdminClient, AdminShopifyError,
    queries::{
        WebhookSubscriptionCreate,
        webhook_subscription_create::{
            self, WebhookSubscriptionFormat, WebhookSubscriptionTopic,
        },
    },
};

impl AdminClient {
    /// Subscribe `callback_url` to a webhook topic.
    ///
    /// Returns the subscription ID.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::UserError` if Shopify rejects the
    /// subscription (e.g. it already exists), or another error if the
    /// request fails.
    #[instrument(skip(self), fields(shop = %self.shop()))]
    pub async fn create_webhook_subscription(
        &self,
        topic: WebhookTopic,
        callback_url: &str,
    ) -> Result<String, AdminShopifyError> {
        let variables = webhook_subscription_create::Variables {
            topic: subscription_topic(topic),
            webhook_subscription: webhook_subscription_create::WebhookSubscriptionInput {
                callback_url: Some(callback_url.to_string()),
                format: Some(WebhookSubscriptionFormat::JSON),
            },
        };

        let response = self.execute::<WebhookSubscriptionCreate>(variables).await?;
        let payload = response.webhook_subscription_create.ok_or_else(|| {
            AdminShopifyError::NotFound("webhookSubscriptionCreate payload".to_string())
        })?;

        if !payload.user_errors.is_empty() {
            let messages: Vec<String> = payload
                .user_errors
                .into_iter()
                .map(|e| e.message)
                .collect();
            return Err(AdminShopifyError::UserError(messages.join("; ")));
        }

        payload
            .webhook_subscription
            .map(|s| s.id)
            .ok_or_else(|| AdminShopifyError::NotFound("webhook subscription".to_string()))
    }

    /// Subscribe `callback_url` to every topic in [`WebhookTopic::SUBSCRIBED`].
    ///
    /// Failures are logged per topic and do not stop the remaining
    /// registrations. Returns the number of subscriptions created.
    pub async fn register_webhooks(&self, callback_url: &str) -> usize {
        let mut created = 0;
        for topic in WebhookTopic::SUBSCRIBED {
            match self.create_webhook_subscription(topic, callback_url).await {
                Ok(id) => {
                    info!(shop = %self.shop(), topic = %topic, subscription_id = %id, "Registered webhook");
                    created += 1;
                }
                Err(e) => {
                    warn!(shop = %self.shop(), topic = %topic, error = %e, "Failed to register webhook");
                }
            }
        }
        created
    }
}

fn subscription_topic(topic: WebhookTopic) -> WebhookSubscriptionTopic {
    match topic {
        WebhookTopic::OrderCreated => WebhookSubscriptionTopic::ORDERS_CREATE,
        WebhookTopic::OrderFulfilled => WebhookSubscriptionTopic::ORDERS_FULFILLED,
        WebhookTopic::OrderCancelled => WebhookSubscriptionTopic::ORDERS_CANCELLED,
        WebhookTopic::AppUninstalled => WebhookSubscriptionTopic::APP_UNINSTALLED,
        // Compliance topics are configured in the app settings, not through the API
        other => WebhookSubscriptionTopic::Other(other.as_graphql().to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_topic_matches_graphql_name() {
        for topic in WebhookTopic::SUBSCRIBED {
            let value = serde_json::to_value(subscription_topic(topic)).unwrap();
            assert_eq!(value, topic.as_graphql());
        }
    }
}
