//! Shop session repository.
//!
//! Sessions live in the `shop_sessions` table. A shop normally has a single
//! offline row; online rows are kept for completeness and are removed along
//! with it when the shop uninstalls or is redacted.

use std::future::Future;

use chrono::{DateTime, Utc};
use processing_time_core::ShopDomain;
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;

use super::RepositoryError;
use crate::models::ShopSession;

/// Persistent storage for shop sessions.
pub trait SessionStore: Send + Sync {
    /// The session to use for background work on `shop`.
    ///
    /// Prefers an offline session holding an access token.
    fn find_by_shop(
        &self,
        shop: &ShopDomain,
    ) -> impl Future<Output = Result<Option<ShopSession>, RepositoryError>> + Send;

    /// Look up a session by id.
    fn find_by_id(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<ShopSession>, RepositoryError>> + Send;

    /// Insert or replace a session.
    fn save(&self, session: &ShopSession)
    -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete every session of `shop`, returning how many were removed.
    fn delete_by_shop(
        &self,
        shop: &ShopDomain,
    ) -> impl Future<Output = Result<u64, RepositoryError>> + Send;
}

/// Internal row type for `PostgreSQL` queries.
#[derive(Debug, sqlx::FromRow)]
struct ShopSessionRow {
    id: String,
    shop: String,
    state: String,
    is_online: bool,
    scope: Option<String>,
    expires: Option<DateTime<Utc>>,
    access_token: Option<String>,
}

impl TryFrom<ShopSessionRow> for ShopSession {
    type Error = RepositoryError;

    fn try_from(row: ShopSessionRow) -> Result<Self, Self::Error> {
        let shop = ShopDomain::parse(&row.shop).map_err(|e| {
            RepositoryError::DataCorruption(format!("session {} has bad shop: {e}", row.id))
        })?;

        Ok(Self {
            id: row.id,
            shop,
            state: row.state,
            is_online: row.is_online,
            scope: row.scope,
            expires: row.expires,
            access_token: row.access_token.map(SecretString::from),
        })
    }
}

/// Repository for shop session database operations.
#[derive(Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    /// Create a new session repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl SessionStore for SessionRepository {
    async fn find_by_shop(&self, shop: &ShopDomain) -> Result<Option<ShopSession>, RepositoryError> {
        let row = sqlx::query_as::<_, ShopSessionRow>(
            r"
            SELECT id, shop, state, is_online, scope, expires, access_token
            FROM shop_sessions
            WHERE shop = $1
            ORDER BY (access_token IS NULL), is_online, updated_at DESC
            LIMIT 1
            ",
        )
        .bind(shop.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ShopSession::try_from).transpose()
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ShopSession>, RepositoryError> {
        let row = sqlx::query_as::<_, ShopSessionRow>(
            r"
            SELECT id, shop, state, is_online, scope, expires, access_token
            FROM shop_sessions
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ShopSession::try_from).transpose()
    }

    async fn save(&self, session: &ShopSession) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO shop_sessions (id, shop, state, is_online, scope, expires, access_token)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                shop = EXCLUDED.shop,
                state = EXCLUDED.state,
                is_online = EXCLUDED.is_online,
                scope = EXCLUDED.scope,
                expires = EXCLUDED.expires,
                access_token = EXCLUDED.access_token,
                updated_at = NOW()
            ",
        )
        .bind(&session.id)
        .bind(session.shop.as_str())
        .bind(&session.state)
        .bind(session.is_online)
        .bind(session.scope.as_deref())
        .bind(session.expires)
        .bind(session.access_token.as_ref().map(|token| token.expose_secret()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_by_shop(&self, shop: &ShopDomain) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM shop_sessions WHERE shop = $1")
            .bind(shop.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn row(shop: &str) -> ShopSessionRow {
        ShopSessionRow {
            id: format!("offline_{shop}"),
            shop: shop.to_string(),
            state: "nonce".to_string(),
            is_online: false,
            scope: Some("read_orders".to_string()),
            expires: None,
            access_token: Some("shpat_token".to_string()),
        }
    }

    #[test]
    fn test_row_conversion() {
        let session = ShopSession::try_from(row("acme.myshopify.com")).unwrap();
        assert_eq!(session.shop.as_str(), "acme.myshopify.com");
        assert_eq!(session.id, "offline_acme.myshopify.com");
        assert!(session.is_active());
    }

    #[test]
    fn test_row_conversion_rejects_bad_shop() {
        let err = ShopSession::try_from(row("")).unwrap_err();
        assert!(matches!(err, RepositoryError::DataCorruption(_)));
    }
}
