//! Integration tests for the processing time app.
//!
//! The Admin API and session storage are replaced by in-memory fakes so the
//! recomputation workflow and webhook dispatch run end to end without
//! Shopify or Postgres.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p processing-time-integration-tests
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use processing_time_app::db::{RepositoryError, SessionStore};
use processing_time_app::models::ShopSession;
use processing_time_app::services::{ConnectAdmin, MetafieldStore, OrderSearch, WebhookEvent};
use processing_time_app::shopify::AdminShopifyError;
use processing_time_core::{
    Metafield, MetafieldKey, MetafieldType, OrderLineItem, OrderPage, OrderSummary, ProductRef,
    ShopDomain, UnfulfilledOrderFilter,
};
use secrecy::SecretString;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Failure injected into [`FakeShopify`] for one product.
#[derive(Debug, Clone)]
pub enum InjectedFailure {
    /// Reads of the product's metafields are rate limited.
    RateLimited,
    /// Writes of the product's metafields are rejected with a user error.
    RejectWrite(String),
    /// Reads of the product's metafields return an undecodable payload.
    MissingPayload,
}

/// A metafield write recorded by [`FakeShopify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetafieldWrite {
    pub owner: ProductRef,
    pub key: MetafieldKey,
    pub value: String,
    pub value_type: MetafieldType,
}

#[derive(Debug, Default)]
struct FakeShopifyState {
    metafields: HashMap<(ProductRef, MetafieldKey), String>,
    orders: Vec<OrderSummary>,
    writes: Vec<MetafieldWrite>,
    searches: Vec<(u64, Option<String>)>,
    failures: HashMap<ProductRef, InjectedFailure>,
}

/// In-memory Admin API: metafields keyed by owner and key, and a list of
/// open paid orders served in pages.
#[derive(Debug, Clone)]
pub struct FakeShopify {
    state: Arc<Mutex<FakeShopifyState>>,
    page_size: usize,
}

impl Default for FakeShopify {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeShopify {
    /// Create an empty store serving 100 orders per page.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::default(),
            page_size: 100,
        }
    }

    /// Serve order searches `page_size` orders at a time.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Set the assembly time metafield of a product.
    pub fn set_assembly_time(&self, product: &ProductRef, value: &str) {
        lock(&self.state)
            .metafields
            .insert((product.clone(), MetafieldKey::ASSEMBLY_TIME), value.to_string());
    }

    /// Add an open paid order.
    pub fn add_order(&self, id: &str, line_items: &[(Option<&ProductRef>, u64)]) {
        let line_items = line_items
            .iter()
            .map(|(product, fulfillable)| OrderLineItem {
                product: product.cloned(),
                quantity: *fulfillable,
                fulfillable_quantity: *fulfillable,
            })
            .collect();
        lock(&self.state).orders.push(OrderSummary {
            id: format!("gid://shopify/Order/{id}"),
            line_items,
        });
    }

    /// Make calls about `product` fail.
    pub fn fail(&self, product: &ProductRef, failure: InjectedFailure) {
        lock(&self.state).failures.insert(product.clone(), failure);
    }

    /// Current value of a product's metafield.
    #[must_use]
    pub fn metafield(&self, product: &ProductRef, key: MetafieldKey) -> Option<String> {
        lock(&self.state)
            .metafields
            .get(&(product.clone(), key))
            .cloned()
    }

    /// Current processing time of a product.
    #[must_use]
    pub fn processing_time(&self, product: &ProductRef) -> Option<String> {
        self.metafield(product, MetafieldKey::PROCESSING_TIME)
    }

    /// Every metafield write so far.
    #[must_use]
    pub fn writes(&self) -> Vec<MetafieldWrite> {
        lock(&self.state).writes.clone()
    }

    /// Every order search so far as `(product id, cursor)`.
    #[must_use]
    pub fn searches(&self) -> Vec<(u64, Option<String>)> {
        lock(&self.state).searches.clone()
    }
}

impl MetafieldStore for FakeShopify {
    async fn get_metafield(
        &self,
        owner: &ProductRef,
        key: MetafieldKey,
    ) -> Result<Option<Metafield>, AdminShopifyError> {
        let state = lock(&self.state);
        match state.failures.get(owner) {
            Some(InjectedFailure::RateLimited) => return Err(AdminShopifyError::RateLimited(2)),
            Some(InjectedFailure::MissingPayload) => {
                return Err(AdminShopifyError::NotFound("product payload".to_string()));
            }
            _ => {}
        }
        Ok(state
            .metafields
            .get(&(owner.clone(), key))
            .map(|value| Metafield {
                id: format!("gid://shopify/Metafield/{}", owner.numeric_id()),
                value: value.clone(),
            }))
    }

    async fn set_metafield(
        &self,
        owner: &ProductRef,
        key: MetafieldKey,
        value: &str,
        value_type: MetafieldType,
    ) -> Result<Metafield, AdminShopifyError> {
        let mut state = lock(&self.state);
        if let Some(InjectedFailure::RejectWrite(message)) = state.failures.get(owner) {
            return Err(AdminShopifyError::UserError(message.clone()));
        }
        state
            .metafields
            .insert((owner.clone(), key), value.to_string());
        state.writes.push(MetafieldWrite {
            owner: owner.clone(),
            key,
            value: value.to_string(),
            value_type,
        });
        Ok(Metafield {
            id: format!("gid://shopify/Metafield/{}", owner.numeric_id()),
            value: value.to_string(),
        })
    }
}

impl OrderSearch for FakeShopify {
    async fn search_orders(
        &self,
        filter: &UnfulfilledOrderFilter,
        after: Option<&str>,
    ) -> Result<OrderPage, AdminShopifyError> {
        let mut state = lock(&self.state);
        state
            .searches
            .push((filter.product_id(), after.map(String::from)));

        let matching: Vec<&OrderSummary> = state
            .orders
            .iter()
            .filter(|order| {
                order.line_items.iter().any(|item| {
                    item.product
                        .as_ref()
                        .is_some_and(|p| p.numeric_id() == filter.product_id())
                })
            })
            .collect();

        let start = match after {
            Some(cursor) => cursor
                .strip_prefix("cursor-")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| AdminShopifyError::UserError(format!("bad cursor {cursor}")))?,
            None => 0,
        };
        let end = (start + self.page_size).min(matching.len());
        let orders = matching
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .map(|order| (*order).clone())
            .collect();
        let has_next_page = end < matching.len();

        Ok(OrderPage {
            orders,
            has_next_page,
            end_cursor: has_next_page.then(|| format!("cursor-{end}")),
        })
    }
}

impl ConnectAdmin for FakeShopify {
    type Client = Self;

    fn connect(&self, session: &ShopSession) -> Result<Self, AdminShopifyError> {
        if session.access_token.is_none() {
            return Err(AdminShopifyError::NoAccessToken(session.shop.to_string()));
        }
        Ok(self.clone())
    }
}

/// In-memory session store.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessions {
    sessions: Arc<Mutex<Vec<ShopSession>>>,
    unavailable: Arc<Mutex<bool>>,
}

impl InMemorySessions {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session row.
    pub fn insert(&self, session: ShopSession) {
        lock(&self.sessions).push(session);
    }

    /// Number of rows stored for `shop`.
    #[must_use]
    pub fn count(&self, shop: &ShopDomain) -> usize {
        lock(&self.sessions)
            .iter()
            .filter(|s| &s.shop == shop)
            .count()
    }

    /// Make every call fail as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        *lock(&self.unavailable) = unavailable;
    }

    fn check(&self) -> Result<(), RepositoryError> {
        if *lock(&self.unavailable) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

impl SessionStore for InMemorySessions {
    async fn find_by_shop(&self, shop: &ShopDomain) -> Result<Option<ShopSession>, RepositoryError> {
        self.check()?;
        let sessions = lock(&self.sessions);
        let mut candidates: Vec<&ShopSession> =
            sessions.iter().filter(|s| &s.shop == shop).collect();
        candidates.sort_by_key(|s| (s.access_token.is_none(), s.is_online));
        Ok(candidates.first().map(|s| (*s).clone()))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ShopSession>, RepositoryError> {
        self.check()?;
        Ok(lock(&self.sessions).iter().find(|s| s.id == id).cloned())
    }

    async fn save(&self, session: &ShopSession) -> Result<(), RepositoryError> {
        self.check()?;
        let mut sessions = lock(&self.sessions);
        sessions.retain(|s| s.id != session.id);
        sessions.push(session.clone());
        Ok(())
    }

    async fn delete_by_shop(&self, shop: &ShopDomain) -> Result<u64, RepositoryError> {
        self.check()?;
        let mut sessions = lock(&self.sessions);
        let before = sessions.len();
        sessions.retain(|s| &s.shop != shop);
        Ok((before - sessions.len()) as u64)
    }
}

/// Parse a shop domain in tests.
///
/// # Panics
///
/// Panics if `shop` is not a valid domain.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn shop(shop: &str) -> ShopDomain {
    ShopDomain::parse(shop).unwrap()
}

/// An installed offline session for `shop`.
#[must_use]
pub fn offline_session(shop: &ShopDomain) -> ShopSession {
    ShopSession {
        id: shop.offline_session_id(),
        shop: shop.clone(),
        state: String::new(),
        is_online: false,
        scope: Some("read_orders,write_products".to_string()),
        expires: None,
        access_token: Some(SecretString::from("shpat_test_token")),
    }
}

/// An online session for one staff member of `shop`.
#[must_use]
pub fn online_session(shop: &ShopDomain, user: u64) -> ShopSession {
    ShopSession {
        id: format!("{shop}_{user}"),
        is_online: true,
        ..offline_session(shop)
    }
}

/// A webhook event with a JSON body.
#[must_use]
pub fn event(
    topic: &str,
    shop: &ShopDomain,
    payload: &serde_json::Value,
    session: Option<ShopSession>,
) -> WebhookEvent {
    WebhookEvent {
        topic: topic.to_string(),
        shop: shop.clone(),
        payload: Bytes::from(payload.to_string()),
        session,
    }
}
