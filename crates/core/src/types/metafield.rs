//! Metafield keys and the two values this app reads and writes.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Address of a metafield on its owner: `(namespace, key)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetafieldKey {
    /// Namespace grouping related metafields.
    pub namespace: &'static str,
    /// Key within the namespace.
    pub key: &'static str,
}

impl MetafieldKey {
    /// Merchant-entered assembly time per unit.
    pub const ASSEMBLY_TIME: Self = Self {
        namespace: "assembly_info",
        key: "assembly_time",
    };

    /// Derived processing time for all open orders of a product.
    pub const PROCESSING_TIME: Self = Self {
        namespace: "processing_info",
        key: "processing_time",
    };
}

impl fmt::Display for MetafieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.key)
    }
}

/// Admin API metafield value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetafieldType {
    /// Whole number (`number_integer`).
    NumberInteger,
}

impl MetafieldType {
    /// The type name expected by the Admin API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NumberInteger => "number_integer",
        }
    }
}

/// A metafield as returned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metafield {
    /// Metafield global ID.
    pub id: String,
    /// Raw string value.
    pub value: String,
}

/// Error returned when a metafield value is not a non-negative integer.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("not a non-negative integer: {0:?}")]
pub struct InvalidMetafieldValue(pub String);

/// Assembly time of a single unit, set by the merchant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssemblyTime(u64);

impl AssemblyTime {
    /// Create an assembly time.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Parse the stored metafield value.
    ///
    /// Surrounding whitespace is ignored. Negative, fractional and
    /// non-numeric values are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidMetafieldValue`] with the original input.
    pub fn parse(value: &str) -> Result<Self, InvalidMetafieldValue> {
        value
            .trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| InvalidMetafieldValue(value.to_string()))
    }

    /// Get the underlying value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AssemblyTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Processing time derived from assembly time and open demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessingTime(u64);

impl ProcessingTime {
    /// Compute `assembly_time * unfulfilled_quantity`.
    ///
    /// Saturates at `u64::MAX` instead of wrapping.
    ///
    /// ```
    /// use processing_time_core::{AssemblyTime, ProcessingTime};
    ///
    /// let time = ProcessingTime::compute(AssemblyTime::new(4), 5);
    /// assert_eq!(time.get(), 20);
    /// ```
    #[must_use]
    pub const fn compute(assembly_time: AssemblyTime, unfulfilled_quantity: u64) -> Self {
        Self(assembly_time.0.saturating_mul(unfulfilled_quantity))
    }

    /// Get the underlying value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProcessingTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_metafield_keys() {
        assert_eq!(MetafieldKey::ASSEMBLY_TIME.to_string(), "assembly_info.assembly_time");
        assert_eq!(
            MetafieldKey::PROCESSING_TIME.to_string(),
            "processing_info.processing_time"
        );
    }

    #[test]
    fn test_metafield_type_name() {
        assert_eq!(MetafieldType::NumberInteger.as_str(), "number_integer");
    }

    #[test]
    fn test_assembly_time_parse() {
        assert_eq!(AssemblyTime::parse("4").unwrap(), AssemblyTime::new(4));
        assert_eq!(AssemblyTime::parse(" 12 ").unwrap(), AssemblyTime::new(12));
        assert_eq!(AssemblyTime::parse("0").unwrap(), AssemblyTime::default());
    }

    #[test]
    fn test_assembly_time_rejects_invalid() {
        for bad in ["-1", "1.5", "", "four"] {
            let err = AssemblyTime::parse(bad).unwrap_err();
            assert_eq!(err.0, bad);
        }
    }

    #[test]
    fn test_processing_time_is_product() {
        for (assembly, quantity) in [(0, 0), (0, 9), (3, 0), (4, 5), (7, 11)] {
            let time = ProcessingTime::compute(AssemblyTime::new(assembly), quantity);
            assert_eq!(time.get(), assembly * quantity);
        }
    }

    #[test]
    fn test_processing_time_saturates() {
        let time = ProcessingTime::compute(AssemblyTime::new(u64::MAX), 2);
        assert_eq!(time.get(), u64::MAX);
    }
}
