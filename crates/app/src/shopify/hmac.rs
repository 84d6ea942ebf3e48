//! HMAC verification for requests signed by Shopify.
//!
//! Webhooks carry a base64 HMAC-SHA256 of the raw body in
//! `X-Shopify-Hmac-Sha256`. OAuth redirects carry a hex HMAC-SHA256 of the
//! remaining query parameters, sorted by key and joined as `k=v&k=v`.
//! Both are keyed with the app's API secret and compared in constant time.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Reasons a signature is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    /// No signature was supplied.
    #[error("missing signature")]
    Missing,
    /// The signature is not valid base64/hex.
    #[error("malformed signature")]
    Malformed,
    /// The signature does not match the payload.
    #[error("signature mismatch")]
    Mismatch,
}

fn mac(secret: &[u8]) -> Result<HmacSha256, SignatureError> {
    HmacSha256::new_from_slice(secret).map_err(|_| SignatureError::Malformed)
}

/// Verify the `X-Shopify-Hmac-Sha256` header of a webhook.
///
/// # Errors
///
/// Returns a [`SignatureError`] if the header is absent, undecodable or wrong.
pub fn verify_webhook(
    secret: &[u8],
    body: &[u8],
    header: Option<&str>,
) -> Result<(), SignatureError> {
    let header = header.map(str::trim).filter(|h| !h.is_empty());
    let Some(header) = header else {
        return Err(SignatureError::Missing);
    };
    let expected = STANDARD
        .decode(header)
        .map_err(|_| SignatureError::Malformed)?;

    let mut mac = mac(secret)?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| SignatureError::Mismatch)
}

/// Sign a webhook body the way Shopify does.
///
/// # Errors
///
/// Returns [`SignatureError::Malformed`] if the key is rejected.
pub fn sign_webhook(secret: &[u8], body: &[u8]) -> Result<String, SignatureError> {
    let mut mac = mac(secret)?;
    mac.update(body);
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Verify the `hmac` parameter of an OAuth redirect.
///
/// `params` are all query parameters as received; `hmac` and `signature`
/// are excluded from the signed message.
///
/// # Errors
///
/// Returns a [`SignatureError`] if `hmac` is absent, undecodable or wrong.
pub fn verify_query<'a, I>(secret: &[u8], params: I) -> Result<(), SignatureError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut provided = None;
    let mut pairs: Vec<(&str, &str)> = Vec::new();
    for (key, value) in params {
        match key {
            "hmac" => provided = Some(value),
            "signature" => {}
            _ => pairs.push((key, value)),
        }
    }

    let provided = provided.ok_or(SignatureError::Missing)?;
    let expected = hex::decode(provided).map_err(|_| SignatureError::Malformed)?;

    let mut mac = mac(secret)?;
    mac.update(query_message(pairs).as_bytes());
    mac.verify_slice(&expected)
        .map_err(|_| SignatureError::Mismatch)
}

/// Sign OAuth query parameters the way Shopify does.
///
/// # Errors
///
/// Returns [`SignatureError::Malformed`] if the key is rejected.
pub fn sign_query<'a, I>(secret: &[u8], params: I) -> Result<String, SignatureError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let pairs = params
        .into_iter()
        .filter(|(key, _)| *key != "hmac" && *key != "signature")
        .collect();
    let mut mac = mac(secret)?;
    mac.update(query_message(pairs).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn query_message(mut pairs: Vec<(&str, &str)>) -> String {
    pairs.sort_unstable();
    pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"hush";

    #[test]
    fn test_webhook_signature_roundtrip() {
        let body = br#"{"id":1}"#;
        let signature = sign_webhook(SECRET, body).unwrap();
        assert_eq!(verify_webhook(SECRET, body, Some(&signature)), Ok(()));
    }

    #[test]
    fn test_webhook_signature_known_vector() {
        // HMAC-SHA256("key", "The quick brown fox jumps over the lazy dog")
        let signature = "97yD9DBThCSxMpjmqm+xQ+9NWaFJRhdZl0edvC0aPNg=";
        assert_eq!(
            verify_webhook(
                b"key",
                b"The quick brown fox jumps over the lazy dog",
                Some(signature)
            ),
            Ok(())
        );
    }

    #[test]
    fn test_webhook_signature_rejects_tampered_body() {
        let signature = sign_webhook(SECRET, b"original").unwrap();
        assert_eq!(
            verify_webhook(SECRET, b"tampered", Some(&signature)),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_webhook_signature_missing_or_malformed() {
        assert_eq!(verify_webhook(SECRET, b"x", None), Err(SignatureError::Missing));
        assert_eq!(verify_webhook(SECRET, b"x", Some("  ")), Err(SignatureError::Missing));
        assert_eq!(
            verify_webhook(SECRET, b"x", Some("not base64!")),
            Err(SignatureError::Malformed)
        );
    }

    #[test]
    fn test_query_signature_ignores_order() {
        let params = [
            ("shop", "acme.myshopify.com"),
            ("code", "0907a61c0c8d55e99db179b68161bc00"),
            ("timestamp", "1337178173"),
            ("state", "nonce"),
        ];
        let hmac = sign_query(SECRET, params).unwrap();

        let mut received: Vec<(&str, &str)> = params.iter().rev().copied().collect();
        received.push(("hmac", &hmac));
        assert_eq!(verify_query(SECRET, received), Ok(()));
    }

    #[test]
    fn test_query_signature_rejects_changed_param() {
        let hmac = sign_query(SECRET, [("shop", "acme.myshopify.com"), ("code", "a")]).unwrap();
        let received = [("shop", "evil.myshopify.com"), ("code", "a"), ("hmac", hmac.as_str())];
        assert_eq!(verify_query(SECRET, received), Err(SignatureError::Mismatch));
    }

    #[test]
    fn test_query_signature_missing() {
        assert_eq!(
            verify_query(SECRET, [("shop", "acme.myshopify.com")]),
            Err(SignatureError::Missing)
        );
        assert_eq!(
            verify_query(SECRET, [("hmac", "zz")]),
            Err(SignatureError::Malformed)
        );
    }
}
