//! Identifiers for shops and products.
//!
//! Shopify identifies merchants by their `*.myshopify.com` domain and
//! resources by global IDs (`gid://shopify/Product/123`). REST webhook
//! payloads still carry the legacy numeric id, so [`ProductRef`] converts
//! between both forms.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing identifiers.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The shop domain is empty.
    #[error("shop domain cannot be empty")]
    EmptyShop,
    /// The shop domain contains characters that cannot appear in a host name.
    #[error("invalid shop domain: {0}")]
    InvalidShop(String),
    /// The input is not a global ID.
    #[error("not a global id: {0}")]
    NotGlobalId(String),
    /// The global ID refers to a different resource type.
    #[error("expected a Product id, got {0}")]
    WrongResource(String),
    /// The numeric suffix is missing or not a positive integer.
    #[error("invalid numeric id in {0}")]
    InvalidNumericId(String),
}

/// A merchant's shop domain (e.g. `acme.myshopify.com`).
///
/// Scopes every operation: sessions, API calls and webhook handling.
/// Parsing trims surrounding whitespace and lowercases the domain.
///
/// ```
/// use processing_time_core::ShopDomain;
///
/// let shop = ShopDomain::parse(" Acme.myshopify.com ").unwrap();
/// assert_eq!(shop.as_str(), "acme.myshopify.com");
/// assert!(ShopDomain::parse("").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShopDomain(String);

impl ShopDomain {
    const SUFFIX: &'static str = ".myshopify.com";

    /// Parse a shop domain.
    ///
    /// Only `<name>.myshopify.com` is accepted, where the name is ASCII
    /// letters, digits and `-` and does not start with `-`.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::EmptyShop`] for blank input and
    /// [`IdError::InvalidShop`] for anything that is not a myshopify domain.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(IdError::EmptyShop);
        }

        let normalized = trimmed.to_ascii_lowercase();
        let valid = normalized
            .strip_suffix(Self::SUFFIX)
            .is_some_and(|name| {
                !name.is_empty()
                    && !name.starts_with('-')
                    && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            });
        if !valid {
            return Err(IdError::InvalidShop(trimmed.to_string()));
        }

        Ok(Self(normalized))
    }

    /// Get the domain as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Session id used for the shop's offline access token.
    #[must_use]
    pub fn offline_session_id(&self) -> String {
        format!("offline_{}", self.0)
    }
}

impl fmt::Display for ShopDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ShopDomain {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ShopDomain {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ShopDomain> for String {
    fn from(shop: ShopDomain) -> Self {
        shop.0
    }
}

/// Reference to a product by its global ID.
///
/// ```
/// use processing_time_core::ProductRef;
///
/// let product = ProductRef::parse("gid://shopify/Product/632910392").unwrap();
/// assert_eq!(product.numeric_id(), 632_910_392);
/// assert_eq!(ProductRef::from_legacy_id(632_910_392), product);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProductRef {
    gid: String,
    numeric_id: u64,
}

impl ProductRef {
    const RESOURCE: &'static str = "Product";
    const PREFIX: &'static str = "gid://";

    /// Parse a product global ID.
    ///
    /// The last path segment must be a positive integer and the segment
    /// before it must be `Product`.
    ///
    /// # Errors
    ///
    /// Returns an [`IdError`] describing why the input is not a product gid.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        let gid = s.trim();
        let Some(path) = gid.strip_prefix(Self::PREFIX) else {
            return Err(IdError::NotGlobalId(gid.to_string()));
        };

        let mut segments = path.rsplit('/');
        let numeric = segments.next().unwrap_or_default();
        let resource = segments.next().unwrap_or_default();

        if resource != Self::RESOURCE {
            return Err(IdError::WrongResource(gid.to_string()));
        }

        let numeric_id = numeric
            .parse::<u64>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| IdError::InvalidNumericId(gid.to_string()))?;

        Ok(Self {
            gid: gid.to_string(),
            numeric_id,
        })
    }

    /// Build a product reference from the legacy numeric id used in REST
    /// webhook payloads.
    #[must_use]
    pub fn from_legacy_id(id: u64) -> Self {
        Self {
            gid: format!("gid://shopify/{}/{id}", Self::RESOURCE),
            numeric_id: id,
        }
    }

    /// The global ID string.
    #[must_use]
    pub fn as_gid(&self) -> &str {
        &self.gid
    }

    /// The numeric suffix of the global ID.
    #[must_use]
    pub const fn numeric_id(&self) -> u64 {
        self.numeric_id
    }
}

impl fmt::Display for ProductRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.gid)
    }
}

impl FromStr for ProductRef {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ProductRef {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ProductRef> for String {
    fn from(product: ProductRef) -> Self {
        product.gid
    }
}
