//! Unified error handling for HTTP handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::DispatchError;
use crate::shopify::AdminShopifyError;

/// Application-level error type for route handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Shopify API operation failed.
    #[error("Shopify error: {0}")]
    Shopify(#[from] AdminShopifyError),

    /// Webhook could not be dispatched.
    #[error("Webhook error: {0}")]
    Dispatch(#[from] DispatchError),

    /// Request signature or OAuth state did not verify.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Dispatch(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Dispatch(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Shopify(_) => StatusCode::BAD_GATEWAY,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::warn!(error = %self, status = status.as_u16(), "Request rejected");
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(_) | Self::Dispatch(_) if status.is_server_error() => {
                "Internal server error".to_string()
            }
            Self::Shopify(_) => "External service error".to_string(),
            Self::Unauthorized(_) => "Unauthorized".to_string(),
            _ => self.to_string(),
        };

        (status, message).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use processing_time_core::{ProductRef, WebhookTopic};

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::BadRequest("missing shop".to_string());
        assert_eq!(err.to_string(), "Bad request: missing shop");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::Unauthorized("hmac".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::DataCorruption("bad shop".to_string()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_dispatch_error_status_codes() {
        assert_eq!(
            get_status(DispatchError::UnhandledTopic("FOO".to_string()).into()),
            StatusCode::BAD_REQUEST
        );

        let source = serde_json::from_slice::<serde_json::Value>(b"{").unwrap_err();
        assert_eq!(
            get_status(
                DispatchError::InvalidPayload {
                    topic: WebhookTopic::OrderCreated,
                    source,
                }
                .into()
            ),
            StatusCode::BAD_REQUEST
        );

        assert_eq!(
            get_status(
                DispatchError::Unexpected {
                    product: ProductRef::from_legacy_id(7),
                    message: "broken cursor".to_string(),
                }
                .into()
            ),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(DispatchError::Sessions(RepositoryError::Database(sqlx::Error::PoolTimedOut)).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
