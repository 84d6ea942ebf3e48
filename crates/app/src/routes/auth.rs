//! OAuth install flow.
//!
//! `GET /auth?shop=` starts the install by storing a nonce on the shop's
//! offline session and redirecting to Shopify's consent screen.
//! `GET /auth/callback` verifies the redirect, exchanges the code for an
//! offline access token, stores it and subscribes to the app's webhooks.

use axum::{
    Router,
    extract::{Query, State},
    response::Redirect,
    routing::get,
};
use processing_time_core::ShopDomain;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::db::SessionStore;
use crate::error::AppError;
use crate::models::ShopSession;
use crate::shopify::hmac::verify_query;
use crate::state::AppState;

/// Scopes requested at install.
pub const SCOPES: &[&str] = &[
    "read_products",
    "write_products",
    "read_orders",
    "write_orders",
    "read_metafields",
    "write_metafields",
];

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth", get(begin))
        .route("/auth/callback", get(callback))
}

#[derive(Debug, Deserialize)]
struct BeginParams {
    shop: Option<String>,
}

/// GET /auth - Start OAuth for a shop.
#[instrument(skip(state))]
async fn begin(
    State(state): State<AppState>,
    Query(params): Query<BeginParams>,
) -> Result<Redirect, AppError> {
    let shop = parse_shop(params.shop.as_deref())?;
    let nonce = uuid::Uuid::new_v4().to_string();

    // Reinstalls keep the current token until the new one arrives
    let session = match state.sessions().find_by_id(&shop.offline_session_id()).await? {
        Some(mut existing) => {
            existing.state.clone_from(&nonce);
            existing
        }
        None => ShopSession::pending_offline(shop.clone(), nonce.clone()),
    };
    state.sessions().save(&session).await?;

    let auth_url = state.connector().authorization_url(
        &shop,
        &state.config().shopify.oauth_redirect_url(),
        SCOPES,
        &nonce,
    );

    info!(shop = %shop, "Redirecting to Shopify OAuth");
    Ok(Redirect::to(&auth_url))
}

/// GET /auth/callback - Finish OAuth.
#[instrument(skip_all)]
async fn callback(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Redirect, AppError> {
    let shopify = &state.config().shopify;

    verify_query(
        shopify.api_secret.expose_secret().as_bytes(),
        params.iter().map(|(k, v)| (k.as_str(), v.as_str())),
    )
    .map_err(|e| AppError::Unauthorized(format!("OAuth signature: {e}")))?;

    if let Some(error) = param(&params, "error") {
        return Err(AppError::BadRequest(format!("OAuth denied: {error}")));
    }

    let shop = parse_shop(param(&params, "shop"))?;
    let code = param(&params, "code")
        .ok_or_else(|| AppError::BadRequest("Missing code parameter".to_string()))?;
    let nonce = param(&params, "state")
        .ok_or_else(|| AppError::BadRequest("Missing state parameter".to_string()))?;

    let pending = state
        .sessions()
        .find_by_id(&shop.offline_session_id())
        .await?
        .ok_or_else(|| AppError::BadRequest(format!("No install in progress for {shop}")))?;
    if pending.state != nonce {
        warn!(shop = %shop, "OAuth state mismatch");
        return Err(AppError::Unauthorized("OAuth state mismatch".to_string()));
    }

    let token = state.connector().exchange_code(&shop, code).await?;

    let session = ShopSession {
        scope: Some(token.scope.clone()),
        access_token: Some(SecretString::from(token.access_token.clone())),
        expires: None,
        ..pending
    };
    state.sessions().save(&session).await?;
    info!(shop = %shop, scope = %token.scope, "Stored offline session");

    let client = state.connector().connect(&session)?;
    let registered = client.register_webhooks(&shopify.webhook_url()).await;
    info!(shop = %shop, registered, "Webhook subscriptions registered");

    Ok(Redirect::to(&format!(
        "https://{shop}/admin/apps/{}",
        urlencoding::encode(&shopify.api_key)
    )))
}

fn param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

fn parse_shop(shop: Option<&str>) -> Result<ShopDomain, AppError> {
    let shop = shop.ok_or_else(|| AppError::BadRequest("Missing shop parameter".to_string()))?;
    ShopDomain::parse(shop).map_err(|e| AppError::BadRequest(format!("shop: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_param_lookup() {
        let params = vec![
            ("shop".to_string(), "acme.myshopify.com".to_string()),
            ("code".to_string(), "abc".to_string()),
        ];
        assert_eq!(param(&params, "code"), Some("abc"));
        assert_eq!(param(&params, "state"), None);
    }

    #[test]
    fn test_parse_shop() {
        assert_eq!(
            parse_shop(Some(" Acme.myshopify.com ")).unwrap().as_str(),
            "acme.myshopify.com"
        );
        assert!(matches!(parse_shop(None), Err(AppError::BadRequest(_))));
        assert!(matches!(
            parse_shop(Some("acme.myshopify.com/evil")),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_scopes_cover_products_orders_and_metafields() {
        for scope in ["write_products", "read_orders", "write_metafields"] {
            assert!(SCOPES.contains(&scope), "{scope}");
        }
    }
}
