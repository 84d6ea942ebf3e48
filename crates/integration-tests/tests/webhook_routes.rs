//! Request validation of the HTTP routes.
//!
//! Every case here is rejected before the database is touched, so the state
//! is built on a lazy pool pointing at a closed port.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use processing_time_app::config::{AppConfig, LogFormat, ShopifyAppConfig};
use processing_time_app::routes;
use processing_time_app::services::{DEFAULT_RECOMPUTE_CONCURRENCY, MissingAssemblyTime};
use processing_time_app::shopify::hmac::{sign_query, sign_webhook};
use processing_time_app::state::AppState;
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

const SECRET: &str = "shpss_test_secret_for_route_checks";

fn app() -> Router {
    let config = AppConfig {
        database_url: SecretString::from("postgres://127.0.0.1:1/processing_time_test"),
        host: "127.0.0.1".parse().unwrap(),
        port: 3000,
        shopify: ShopifyAppConfig {
            api_key: "test-api-key".to_string(),
            api_secret: SecretString::from(SECRET),
            api_version: "2024-07".to_string(),
            app_url: "https://app.example.com".to_string(),
            request_timeout: Duration::from_secs(5),
        },
        missing_assembly_time: MissingAssemblyTime::Fail,
        recompute_concurrency: DEFAULT_RECOMPUTE_CONCURRENCY,
        log_format: LogFormat::Text,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
        tls: None,
    };
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(100))
        .connect_lazy("postgres://127.0.0.1:1/processing_time_test")
        .unwrap();
    let state = AppState::new(config, pool).unwrap();
    routes::routes().with_state(state)
}

fn webhook(body: &'static str, hmac: Option<&str>, headers: &[(&str, &str)]) -> Request<Body> {
    let mut request = Request::builder().method("POST").uri("/webhooks");
    if let Some(hmac) = hmac {
        request = request.header("X-Shopify-Hmac-Sha256", hmac);
    }
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    request.body(Body::from(body)).unwrap()
}

fn signed(body: &str) -> String {
    sign_webhook(SECRET.as_bytes(), body.as_bytes()).unwrap()
}

#[tokio::test]
async fn test_webhook_without_signature_is_unauthorized() {
    let response = app()
        .oneshot(webhook(
            "{}",
            None,
            &[
                ("X-Shopify-Topic", "orders/create"),
                ("X-Shopify-Shop-Domain", "demo.myshopify.com"),
            ],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_webhook_with_wrong_signature_is_unauthorized() {
    let forged = sign_webhook(b"another-secret", b"{}").unwrap();
    let response = app()
        .oneshot(webhook(
            "{}",
            Some(&forged),
            &[
                ("X-Shopify-Topic", "orders/create"),
                ("X-Shopify-Shop-Domain", "demo.myshopify.com"),
            ],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signature_covers_the_body() {
    let response = app()
        .oneshot(webhook(
            r#"{"id":2}"#,
            Some(&signed(r#"{"id":1}"#)),
            &[
                ("X-Shopify-Topic", "orders/create"),
                ("X-Shopify-Shop-Domain", "demo.myshopify.com"),
            ],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signed_webhook_without_topic_is_bad_request() {
    let response = app()
        .oneshot(webhook(
            "{}",
            Some(&signed("{}")),
            &[("X-Shopify-Shop-Domain", "demo.myshopify.com")],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_signed_webhook_with_invalid_shop_is_bad_request() {
    for shop in ["", "not a shop"] {
        let response = app()
            .oneshot(webhook(
                "{}",
                Some(&signed("{}")),
                &[("X-Shopify-Topic", "orders/create"), ("X-Shopify-Shop-Domain", shop)],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{shop:?}");
    }
}

#[tokio::test]
async fn test_signed_webhook_with_unknown_topic_is_bad_request() {
    let response = app()
        .oneshot(webhook(
            "{}",
            Some(&signed("{}")),
            &[
                ("X-Shopify-Topic", "FOO"),
                ("X-Shopify-Shop-Domain", "demo.myshopify.com"),
            ],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_auth_rejects_foreign_hosts() {
    for shop in ["evil.example.com", "localhost", "127.0.0.1"] {
        let request = Request::builder()
            .uri(format!("/auth?shop={shop}"))
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{shop}");
        assert!(response.headers().get("location").is_none());
    }
}

#[tokio::test]
async fn test_auth_without_shop_is_bad_request() {
    let request = Request::builder().uri("/auth").body(Body::empty()).unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oauth_callback_with_bad_hmac_is_unauthorized() {
    let request = Request::builder()
        .uri("/auth/callback?code=abc&shop=demo.myshopify.com&state=n&timestamp=1&hmac=00ff")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_oauth_callback_denied_by_merchant() {
    let params = [
        ("error", "access_denied"),
        ("shop", "demo.myshopify.com"),
        ("timestamp", "1700000000"),
    ];
    let hmac = sign_query(SECRET.as_bytes(), params).unwrap();
    let uri = format!(
        "/auth/callback?error=access_denied&shop=demo.myshopify.com&timestamp=1700000000&hmac={hmac}"
    );
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
