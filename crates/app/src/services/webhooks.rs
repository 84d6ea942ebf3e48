//! Webhook dispatch.
//!
//! Routes a verified webhook to the work it triggers. Order events recompute
//! the processing time of every distinct product they mention; uninstall and
//! shop redaction remove the shop's sessions; customer compliance requests
//! are answered from what the app stores, which is no customer data at all.

use bytes::Bytes;
use futures::{StreamExt, stream};
use processing_time_core::webhook::{
    CustomerDataRequestPayload, CustomerRedactPayload, ShopRedactPayload,
};
use processing_time_core::{OrderPayload, ProcessingTime, ProductRef, ShopDomain, WebhookTopic};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{info, instrument, warn};

use super::processing_time::{MetafieldStore, OrderSearch, ProcessingTimeService, RecomputeError};
use crate::db::{RepositoryError, SessionStore};
use crate::models::ShopSession;
use crate::shopify::{AdminClient, AdminConnector, AdminShopifyError};

/// Default number of products recomputed at once for one event.
pub const DEFAULT_RECOMPUTE_CONCURRENCY: usize = 4;

/// Builds an Admin API client for a shop session.
pub trait ConnectAdmin: Send + Sync {
    /// Client type handed to the recomputation.
    type Client: MetafieldStore + OrderSearch;

    /// Build a client acting with `session`'s access token.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::NoAccessToken` if the session has no token.
    fn connect(&self, session: &ShopSession) -> Result<Self::Client, AdminShopifyError>;
}

impl ConnectAdmin for AdminConnector {
    type Client = AdminClient;

    fn connect(&self, session: &ShopSession) -> Result<AdminClient, AdminShopifyError> {
        AdminConnector::connect(self, session)
    }
}

/// A webhook delivery, verified and ready to dispatch.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    /// Topic as delivered, either `orders/create` or `ORDERS_CREATE` form.
    pub topic: String,
    /// Shop that sent the webhook.
    pub shop: ShopDomain,
    /// Raw JSON body.
    pub payload: Bytes,
    /// The shop's stored session, if it has one.
    pub session: Option<ShopSession>,
}

/// Everything the app stores about a customer.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CustomerDataReport {
    pub shop: ShopDomain,
    pub customer_id: u64,
    pub data_request_id: u64,
    pub orders_requested: Vec<u64>,
    /// Stored records referencing the customer.
    pub records: Vec<String>,
}

/// Per-product results of an order event.
#[derive(Debug, Default)]
pub struct RecomputeSummary {
    pub updated: Vec<(ProductRef, ProcessingTime)>,
    pub failed: Vec<(ProductRef, RecomputeError)>,
}

impl RecomputeSummary {
    fn first_unexpected(&self) -> Option<&(ProductRef, RecomputeError)> {
        self.failed.iter().find(|(_, e)| e.is_unexpected())
    }
}

/// How an event was handled. Every variant is acknowledged to Shopify.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Order event processed; individual products may have failed.
    Recomputed(RecomputeSummary),
    /// Order event for a shop without an active session.
    NoSession,
    /// App uninstalled; the shop's sessions were deleted.
    Uninstalled { sessions_deleted: u64 },
    /// Customer data request answered.
    DataRequest(CustomerDataReport),
    /// Customer redaction acknowledged.
    CustomerRedacted { customer_id: u64, orders: usize },
    /// Shop redaction completed.
    ShopRedacted { sessions_deleted: u64 },
}

/// Reasons an event was not handled.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Unhandled webhook topic: {0}")]
    UnhandledTopic(String),

    #[error("Invalid {topic} payload: {source}")]
    InvalidPayload {
        topic: WebhookTopic,
        #[source]
        source: serde_json::Error,
    },

    #[error("Session storage failed: {0}")]
    Sessions(#[from] RepositoryError),

    #[error("Recomputation of {product} failed: {message}")]
    Unexpected { product: ProductRef, message: String },
}

impl DispatchError {
    /// Whether the delivery itself is at fault and retrying cannot help.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::UnhandledTopic(_) | Self::InvalidPayload { .. })
    }
}

/// Routes webhook events to their handlers.
pub struct Dispatcher<S, A> {
    sessions: S,
    connector: A,
    service: ProcessingTimeService,
    concurrency: usize,
}

impl<S, A> Dispatcher<S, A>
where
    S: SessionStore,
    A: ConnectAdmin,
{
    /// Create a dispatcher.
    #[must_use]
    pub const fn new(sessions: S, connector: A, service: ProcessingTimeService) -> Self {
        Self {
            sessions,
            connector,
            service,
            concurrency: DEFAULT_RECOMPUTE_CONCURRENCY,
        }
    }

    /// Limit how many products of one event are recomputed at once.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Handle one webhook event.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnhandledTopic`] for topics the app does not
    /// subscribe to, [`DispatchError::InvalidPayload`] for bodies that do not
    /// parse, [`DispatchError::Sessions`] when session storage fails, and
    /// [`DispatchError::Unexpected`] when a product failed for a reason that
    /// redelivery may fix.
    #[instrument(skip_all, fields(shop = %event.shop, topic = %event.topic))]
    pub async fn dispatch(&self, event: WebhookEvent) -> Result<DispatchOutcome, DispatchError> {
        let topic: WebhookTopic = event
            .topic
            .parse()
            .map_err(|_| DispatchError::UnhandledTopic(event.topic.clone()))?;

        match topic {
            WebhookTopic::OrderCreated
            | WebhookTopic::OrderFulfilled
            | WebhookTopic::OrderCancelled => self.order_event(topic, event).await,
            WebhookTopic::AppUninstalled => {
                let sessions_deleted = self.sessions.delete_by_shop(&event.shop).await?;
                info!(sessions_deleted, "App uninstalled, sessions removed");
                Ok(DispatchOutcome::Uninstalled { sessions_deleted })
            }
            WebhookTopic::CustomersDataRequest => {
                let payload: CustomerDataRequestPayload = parse(topic, &event.payload)?;
                warn_on_shop_mismatch(&event.shop, &payload.shop_domain);
                let report = CustomerDataReport {
                    shop: event.shop,
                    customer_id: payload.customer.id,
                    data_request_id: payload.data_request.id,
                    orders_requested: payload.orders_requested,
                    records: Vec::new(),
                };
                info!(
                    customer_id = report.customer_id,
                    data_request_id = report.data_request_id,
                    records = report.records.len(),
                    "Customer data request answered"
                );
                Ok(DispatchOutcome::DataRequest(report))
            }
            WebhookTopic::CustomersRedact => {
                let payload: CustomerRedactPayload = parse(topic, &event.payload)?;
                warn_on_shop_mismatch(&event.shop, &payload.shop_domain);
                info!(
                    customer_id = payload.customer.id,
                    orders = ?payload.orders_to_redact,
                    "Customer redaction acknowledged, no customer data stored"
                );
                Ok(DispatchOutcome::CustomerRedacted {
                    customer_id: payload.customer.id,
                    orders: payload.orders_to_redact.len(),
                })
            }
            WebhookTopic::ShopRedact => {
                let payload: ShopRedactPayload = parse(topic, &event.payload)?;
                warn_on_shop_mismatch(&event.shop, &payload.shop_domain);
                let sessions_deleted = self.sessions.delete_by_shop(&event.shop).await?;
                info!(sessions_deleted, "Shop data redacted");
                Ok(DispatchOutcome::ShopRedacted { sessions_deleted })
            }
        }
    }

    async fn order_event(
        &self,
        topic: WebhookTopic,
        event: WebhookEvent,
    ) -> Result<DispatchOutcome, DispatchError> {
        let payload = OrderPayload::from_slice(&event.payload)
            .map_err(|source| DispatchError::InvalidPayload { topic, source })?;
        let demand = payload.product_demand();

        let Some(session) = event.session.filter(ShopSession::is_active) else {
            warn!("No active session for shop, skipping recomputation");
            return Ok(DispatchOutcome::NoSession);
        };
        let client = match self.connector.connect(&session) {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "Session cannot reach the Admin API, skipping recomputation");
                return Ok(DispatchOutcome::NoSession);
            }
        };

        info!(
            order_id = ?payload.id,
            products = demand.len(),
            "Recomputing processing time for order products"
        );

        let service = self.service;
        let client = &client;
        let results: Vec<(ProductRef, Result<ProcessingTime, RecomputeError>)> =
            stream::iter(demand.products().cloned())
                .map(move |product| async move {
                    let result = service.recompute(client, &product).await;
                    (product, result)
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

        let mut summary = RecomputeSummary::default();
        for (product, result) in results {
            match result {
                Ok(processing_time) => summary.updated.push((product, processing_time)),
                Err(e) => {
                    warn!(product_id = %product, error = %e, "Processing time not updated");
                    summary.failed.push((product, e));
                }
            }
        }

        if let Some((product, e)) = summary.first_unexpected() {
            return Err(DispatchError::Unexpected {
                product: product.clone(),
                message: e.to_string(),
            });
        }
        Ok(DispatchOutcome::Recomputed(summary))
    }
}

fn parse<T: DeserializeOwned>(topic: WebhookTopic, payload: &[u8]) -> Result<T, DispatchError> {
    serde_json::from_slice(payload).map_err(|source| DispatchError::InvalidPayload { topic, source })
}

fn warn_on_shop_mismatch(shop: &ShopDomain, payload_shop: &str) {
    if !payload_shop.eq_ignore_ascii_case(shop.as_str()) {
        warn!(payload_shop, "Compliance payload names a different shop than the header");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors() {
        assert!(DispatchError::UnhandledTopic("FOO".to_string()).is_client_error());
        let source = serde_json::from_slice::<OrderPayload>(b"[").unwrap_err();
        assert!(
            DispatchError::InvalidPayload {
                topic: WebhookTopic::OrderCreated,
                source,
            }
            .is_client_error()
        );
        assert!(
            !DispatchError::Unexpected {
                product: ProductRef::from_legacy_id(1),
                message: "boom".to_string(),
            }
            .is_client_error()
        );
    }
}
