//! Webhook topics and payloads.
//!
//! Shopify names topics differently depending on where they appear: the
//! `X-Shopify-Topic` header uses `orders/create`, GraphQL subscriptions use
//! `ORDERS_CREATE`. [`WebhookTopic`] accepts both.

use core::fmt;
use core::str::FromStr;
use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::ProductRef;

/// Error returned for topics this app does not handle.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unhandled webhook topic: {0}")]
pub struct UnknownTopic(pub String);

/// Webhook topics handled by the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WebhookTopic {
    /// `orders/create`
    OrderCreated,
    /// `orders/fulfilled`
    OrderFulfilled,
    /// `orders/cancelled`
    OrderCancelled,
    /// `app/uninstalled`
    AppUninstalled,
    /// `customers/data_request` (mandatory compliance topic)
    CustomersDataRequest,
    /// `customers/redact` (mandatory compliance topic)
    CustomersRedact,
    /// `shop/redact` (mandatory compliance topic)
    ShopRedact,
}

impl WebhookTopic {
    /// Topics the app subscribes to after installation.
    ///
    /// Compliance topics are configured in the app listing, not subscribed.
    pub const SUBSCRIBED: [Self; 4] = [
        Self::OrderCreated,
        Self::OrderFulfilled,
        Self::OrderCancelled,
        Self::AppUninstalled,
    ];

    /// Whether the topic triggers a processing time recomputation.
    #[must_use]
    pub const fn is_order_event(self) -> bool {
        matches!(
            self,
            Self::OrderCreated | Self::OrderFulfilled | Self::OrderCancelled
        )
    }

    /// Header form, e.g. `orders/create`.
    #[must_use]
    pub const fn as_header(self) -> &'static str {
        match self {
            Self::OrderCreated => "orders/create",
            Self::OrderFulfilled => "orders/fulfilled",
            Self::OrderCancelled => "orders/cancelled",
            Self::AppUninstalled => "app/uninstalled",
            Self::CustomersDataRequest => "customers/data_request",
            Self::CustomersRedact => "customers/redact",
            Self::ShopRedact => "shop/redact",
        }
    }

    /// GraphQL `WebhookSubscriptionTopic` form, e.g. `ORDERS_CREATE`.
    #[must_use]
    pub const fn as_graphql(self) -> &'static str {
        match self {
            Self::OrderCreated => "ORDERS_CREATE",
            Self::OrderFulfilled => "ORDERS_FULFILLED",
            Self::OrderCancelled => "ORDERS_CANCELLED",
            Self::AppUninstalled => "APP_UNINSTALLED",
            Self::CustomersDataRequest => "CUSTOMERS_DATA_REQUEST",
            Self::CustomersRedact => "CUSTOMERS_REDACT",
            Self::ShopRedact => "SHOP_REDACT",
        }
    }
}

impl fmt::Display for WebhookTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_header())
    }
}

impl FromStr for WebhookTopic {
    type Err = UnknownTopic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('/', "_");
        match normalized.as_str() {
            "orders_create" => Ok(Self::OrderCreated),
            "orders_fulfilled" => Ok(Self::OrderFulfilled),
            "orders_cancelled" => Ok(Self::OrderCancelled),
            "app_uninstalled" => Ok(Self::AppUninstalled),
            "customers_data_request" => Ok(Self::CustomersDataRequest),
            "customers_redact" => Ok(Self::CustomersRedact),
            "shop_redact" => Ok(Self::ShopRedact),
            _ => Err(UnknownTopic(s.to_string())),
        }
    }
}

/// Line item as it appears in REST order webhook payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderPayloadLineItem {
    /// Legacy numeric product id; `null` for custom items.
    #[serde(default)]
    pub product_id: Option<u64>,
    /// Ordered quantity.
    #[serde(default)]
    pub quantity: u64,
}

/// The part of an order webhook payload this app reads.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderPayload {
    /// Legacy numeric order id.
    #[serde(default)]
    pub id: Option<u64>,
    /// Line items of the order.
    #[serde(default)]
    pub line_items: Vec<OrderPayloadLineItem>,
}

impl OrderPayload {
    /// Parse an order webhook body.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the body is not an order object.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Distinct products referenced by the order with their summed quantities.
    ///
    /// The quantities are informational only: recomputation always
    /// re-derives demand from the live order data.
    #[must_use]
    pub fn product_demand(&self) -> ProductDemand {
        let mut demand = BTreeMap::new();
        for item in &self.line_items {
            if let Some(id) = item.product_id.filter(|id| *id > 0) {
                let total = demand.entry(ProductRef::from_legacy_id(id)).or_insert(0u64);
                *total = total.saturating_add(item.quantity);
            }
        }
        ProductDemand(demand)
    }
}

/// Distinct products in a webhook payload, in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductDemand(BTreeMap<ProductRef, u64>);

impl ProductDemand {
    /// Number of distinct products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the payload referenced no products.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Summed payload quantity for a product.
    #[must_use]
    pub fn quantity(&self, product: &ProductRef) -> Option<u64> {
        self.0.get(product).copied()
    }

    /// Iterate over the distinct products.
    pub fn products(&self) -> impl Iterator<Item = &ProductRef> {
        self.0.keys()
    }
}

/// Customer reference in compliance payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct ComplianceCustomer {
    /// Legacy numeric customer id.
    pub id: u64,
    /// Customer email, if known.
    #[serde(default)]
    pub email: Option<String>,
}

/// Data request reference in `customers/data_request`.
#[derive(Debug, Clone, Deserialize)]
pub struct DataRequestRef {
    /// Request id assigned by Shopify.
    pub id: u64,
}

/// Body of `customers/data_request`.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDataRequestPayload {
    /// Shop domain the request is for.
    pub shop_domain: String,
    /// The customer requesting their data.
    pub customer: ComplianceCustomer,
    /// Orders the customer asked about.
    #[serde(default)]
    pub orders_requested: Vec<u64>,
    /// The data request.
    pub data_request: DataRequestRef,
}

/// Body of `customers/redact`.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerRedactPayload {
    /// Shop domain the request is for.
    pub shop_domain: String,
    /// The customer to erase.
    pub customer: ComplianceCustomer,
    /// Orders whose customer data must be erased.
    #[serde(default)]
    pub orders_to_redact: Vec<u64>,
}

/// Body of `shop/redact`.
#[derive(Debug, Clone, Deserialize)]
pub struct ShopRedactPayload {
    /// Shop domain to erase.
    pub shop_domain: String,
}
