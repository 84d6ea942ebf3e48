//! GraphQL query definitions for Shopify Admin API.
//!
//! Uses `graphql_client` to generate type-safe Rust code from the operations
//! under `graphql/admin/queries/`, validated against `graphql/admin/schema.graphql`.

use graphql_client::GraphQLQuery;

// =============================================================================
// Custom scalar type aliases (used by graphql_client)
// =============================================================================

/// URL string.
#[allow(clippy::upper_case_acronyms)]
type URL = String;

// =============================================================================
// Metafield queries
// =============================================================================

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/admin/schema.graphql",
    query_path = "graphql/admin/queries/metafields.graphql",
    response_derives = "Debug, Clone"
)]
pub struct GetProductMetafield;

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/admin/schema.graphql",
    query_path = "graphql/admin/queries/metafields.graphql",
    response_derives = "Debug, Clone"
)]
pub struct MetafieldsSet;

// =============================================================================
// Order queries
// =============================================================================

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/admin/schema.graphql",
    query_path = "graphql/admin/queries/orders.graphql",
    response_derives = "Debug, Clone"
)]
pub struct GetUnfulfilledOrders;

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/admin/schema.graphql",
    query_path = "graphql/admin/queries/orders.graphql",
    response_derives = "Debug, Clone"
)]
pub struct GetOrderLineItems;

// =============================================================================
// Webhook subscriptions
// =============================================================================

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/admin/schema.graphql",
    query_path = "graphql/admin/queries/webhooks.graphql",
    response_derives = "Debug, Clone"
)]
pub struct WebhookSubscriptionCreate;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_build_query_uses_operation_name() {
        let body = GetProductMetafield::build_query(get_product_metafield::Variables {
            id: "gid://shopify/Product/1".to_string(),
            namespace: "assembly_info".to_string(),
            key: "assembly_time".to_string(),
        });
        assert_eq!(body.operation_name, "GetProductMetafield");
        assert!(body.query.contains("metafield(namespace: $namespace, key: $key)"));

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["operationName"], "GetProductMetafield");
        assert_eq!(json["variables"]["id"], "gid://shopify/Product/1");
    }

    #[test]
    fn test_orders_variables_are_camel_case() {
        let variables = get_unfulfilled_orders::Variables {
            query: "product_id:1".to_string(),
            first: 100,
            after: None,
            line_items_first: 100,
        };
        let json = serde_json::to_value(&variables).unwrap();
        assert_eq!(json["lineItemsFirst"], 100);
        assert!(json["after"].is_null());
    }

    #[test]
    fn test_metafields_set_input_serializes_type() {
        let input = metafields_set::MetafieldsSetInput {
            owner_id: "gid://shopify/Product/1".to_string(),
            namespace: Some("processing_info".to_string()),
            key: "processing_time".to_string(),
            value: "20".to_string(),
            type_: Some("number_integer".to_string()),
        };
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["ownerId"], "gid://shopify/Product/1");
        assert_eq!(json["type"], "number_integer");
    }

    #[test]
    fn test_webhook_topic_serializes_as_enum_value() {
        let variables = webhook_subscription_create::Variables {
            topic: webhook_subscription_create::WebhookSubscriptionTopic::ORDERS_CREATE,
            webhook_subscription: webhook_subscription_create::WebhookSubscriptionInput {
                callback_url: Some("https://app.example.com/webhooks".to_string()),
                format: Some(webhook_subscription_create::WebhookSubscriptionFormat::JSON),
            },
        };
        let json = serde_json::to_value(&variables).unwrap();
        assert_eq!(json["topic"], "ORDERS_CREATE");
        assert_eq!(
            json["webhookSubscription"]["callbackUrl"],
            "https://app.example.com/webhooks"
        );
        assert_eq!(json["webhookSubscription"]["format"], "JSON");
    }

    #[test]
    fn test_orders_response_deserializes() {
        let data: get_unfulfilled_orders::ResponseData = serde_json::from_str(
            r#"{
                "orders": {
                    "pageInfo": {"hasNextPage": true, "endCursor": "abc"},
                    "nodes": [{
                        "id": "gid://shopify/Order/1",
                        "lineItems": {
                            "pageInfo": {"hasNextPage": false, "endCursor": null},
                            "nodes": [
                                {"product": {"id": "gid://shopify/Product/9"}, "quantity": 3, "fulfillableQuantity": 2},
                                {"product": null, "quantity": 1, "fulfillableQuantity": 1}
                            ]
                        }
                    }]
                }
            }"#,
        )
        .unwrap();

        assert!(data.orders.page_info.has_next_page);
        assert_eq!(data.orders.page_info.end_cursor.as_deref(), Some("abc"));
        let order = data.orders.nodes.first().unwrap();
        assert_eq!(order.line_items.nodes.len(), 2);
        assert!(order.line_items.nodes.get(1).unwrap().product.is_none());
    }
}
