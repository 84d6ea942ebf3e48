//! Shop sessions created by the OAuth install flow.

use chrono::{DateTime, Utc};
use processing_time_core::ShopDomain;
use secrecy::SecretString;

/// A merchant's OAuth session.
///
/// Offline sessions (id `offline_<shop>`) hold the non-expiring access token
/// used for webhook processing. During installation the row exists without
/// a token and `state` carries the OAuth nonce.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct ShopSession {
    /// Session id.
    pub id: String,
    /// Shop the session belongs to.
    pub shop: ShopDomain,
    /// OAuth state nonce.
    pub state: String,
    /// Whether this is a per-user online session.
    pub is_online: bool,
    /// Granted scopes, comma separated.
    pub scope: Option<String>,
    /// Expiry for online sessions.
    pub expires: Option<DateTime<Utc>>,
    /// Admin API access token (HIGH PRIVILEGE - redacted in debug output).
    pub access_token: Option<SecretString>,
}

impl ShopSession {
    /// Start an offline session for `shop` that is waiting for OAuth to
    /// complete.
    #[must_use]
    pub fn pending_offline(shop: ShopDomain, state: String) -> Self {
        Self {
            id: shop.offline_session_id(),
            shop,
            state,
            is_online: false,
            scope: None,
            expires: None,
            access_token: None,
        }
    }

    /// Whether the session can be used for Admin API calls.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.access_token.is_some() && self.expires.is_none_or(|expires| expires > Utc::now())
    }
}

impl std::fmt::Debug for ShopSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopSession")
            .field("id", &self.id)
            .field("shop", &self.shop)
            .field("is_online", &self.is_online)
            .field("scope", &self.scope)
            .field("expires", &self.expires)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn shop() -> ShopDomain {
        ShopDomain::parse("acme.myshopify.com").unwrap()
    }

    #[test]
    fn test_pending_offline_session() {
        let session = ShopSession::pending_offline(shop(), "nonce".to_string());
        assert_eq!(session.id, "offline_acme.myshopify.com");
        assert!(!session.is_online);
        assert!(!session.is_active());
    }

    #[test]
    fn test_is_active_respects_expiry() {
        let mut session = ShopSession::pending_offline(shop(), String::new());
        session.access_token = Some(SecretString::from("shpat_token"));
        assert!(session.is_active());

        session.expires = Some(Utc::now() - Duration::minutes(1));
        assert!(!session.is_active());
    }

    #[test]
    fn test_debug_redacts_access_token() {
        let mut session = ShopSession::pending_offline(shop(), "nonce".to_string());
        session.access_token = Some(SecretString::from("shpat_super_secret"));

        let debug_output = format!("{session:?}");
        assert!(debug_output.contains("acme.myshopify.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("shpat_super_secret"));
        assert!(!debug_output.contains("nonce"));
    }
}
