//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::db::SessionRepository;
use crate::services::{Dispatcher, ProcessingTimeService};
use crate::shopify::{AdminConnector, AdminShopifyError};

/// Dispatcher wired to Postgres sessions and the live Admin API.
pub type WebhookDispatcher = Dispatcher<SessionRepository, AdminConnector>;

/// Application state shared across all handlers.
///
/// Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    pool: PgPool,
    sessions: SessionRepository,
    connector: AdminConnector,
    dispatcher: WebhookDispatcher,
}

impl AppState {
    /// Build the state from configuration and a connected pool.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::Http` if the Admin API HTTP client cannot
    /// be built.
    pub fn new(config: AppConfig, pool: PgPool) -> Result<Self, AdminShopifyError> {
        let connector = AdminConnector::new(&config.shopify)?;
        let sessions = SessionRepository::new(pool.clone());
        let dispatcher = Dispatcher::new(
            sessions.clone(),
            connector.clone(),
            ProcessingTimeService::new(config.missing_assembly_time),
        )
        .with_concurrency(config.recompute_concurrency);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                sessions,
                connector,
                dispatcher,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionRepository {
        &self.inner.sessions
    }

    #[must_use]
    pub fn connector(&self) -> &AdminConnector {
        &self.inner.connector
    }

    #[must_use]
    pub fn dispatcher(&self) -> &WebhookDispatcher {
        &self.inner.dispatcher
    }
}
