//! Shopify webhook intake.
//!
//! Every subscribed topic is delivered to `POST /webhooks`. The body is
//! verified against `X-Shopify-Hmac-Sha256` before anything else is read.

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
};
use processing_time_core::{ShopDomain, WebhookTopic};
use secrecy::ExposeSecret;
use tracing::{Span, debug, instrument};

use crate::db::SessionStore;
use crate::error::AppError;
use crate::services::{DispatchError, WebhookEvent};
use crate::shopify::hmac::verify_webhook;
use crate::state::AppState;

const TOPIC_HEADER: &str = "X-Shopify-Topic";
const SHOP_HEADER: &str = "X-Shopify-Shop-Domain";
const HMAC_HEADER: &str = "X-Shopify-Hmac-Sha256";
const WEBHOOK_ID_HEADER: &str = "X-Shopify-Webhook-Id";

/// Create webhook routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/webhooks", post(receive))
}

/// Receive a webhook delivery.
///
/// POST /webhooks
///
/// Answers 401 for bad signatures, 400 for deliveries that can never
/// succeed and 500 for failures Shopify should retry.
#[instrument(
    skip_all,
    fields(
        topic = tracing::field::Empty,
        shop = tracing::field::Empty,
        webhook_id = tracing::field::Empty,
    )
)]
async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let secret = state.config().shopify.api_secret.expose_secret().as_bytes();
    verify_webhook(secret, &body, header(&headers, HMAC_HEADER))
        .map_err(|e| AppError::Unauthorized(format!("webhook signature: {e}")))?;

    let topic = required_header(&headers, TOPIC_HEADER)?;
    let shop = required_header(&headers, SHOP_HEADER)?;
    let shop = ShopDomain::parse(shop)
        .map_err(|e| AppError::BadRequest(format!("{SHOP_HEADER}: {e}")))?;

    let span = Span::current();
    span.record("topic", topic);
    span.record("shop", shop.as_str());
    if let Some(webhook_id) = header(&headers, WEBHOOK_ID_HEADER) {
        span.record("webhook_id", webhook_id);
    }

    // Only order events act through the Admin API
    let parsed: WebhookTopic = topic
        .parse()
        .map_err(|_| DispatchError::UnhandledTopic(topic.to_string()))?;
    let session = if parsed.is_order_event() {
        state.sessions().find_by_shop(&shop).await?
    } else {
        None
    };
    let event = WebhookEvent {
        topic: topic.to_string(),
        shop,
        payload: body,
        session,
    };

    let outcome = state.dispatcher().dispatch(event).await?;
    debug!(?outcome, "Webhook handled");

    Ok(StatusCode::OK)
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn required_header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, AppError> {
    header(headers, name).ok_or_else(|| AppError::BadRequest(format!("Missing {name} header")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert("x-shopify-topic", HeaderValue::from_static("orders/create"));
        assert_eq!(header(&headers, TOPIC_HEADER), Some("orders/create"));
    }

    #[test]
    fn test_blank_header_is_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(SHOP_HEADER, HeaderValue::from_static("  "));
        assert!(header(&headers, SHOP_HEADER).is_none());
        assert!(matches!(
            required_header(&headers, SHOP_HEADER),
            Err(AppError::BadRequest(_))
        ));
    }
}
