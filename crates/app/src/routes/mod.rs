//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (database)
//!
//! # Webhooks
//! POST /webhooks               - All subscribed Shopify topics
//!
//! # Install
//! GET  /auth                   - Start OAuth for ?shop=
//! GET  /auth/callback          - Finish OAuth, store session, register webhooks
//! ```

use axum::Router;

use crate::state::AppState;

pub mod auth;
pub mod webhooks;

/// Build the app router (health routes are added by the binary).
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(webhooks::router())
        .merge(auth::router())
}
