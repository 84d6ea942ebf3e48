//! Order data needed to count open demand for a product.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::id::ProductRef;

/// A line item on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
    /// Product the line item refers to. `None` for custom items or deleted products.
    pub product: Option<ProductRef>,
    /// Ordered quantity.
    pub quantity: u64,
    /// Quantity not yet fulfilled.
    pub fulfillable_quantity: u64,
}

/// An order with the line items relevant to processing time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    /// Order global ID.
    pub id: String,
    /// All line items of the order.
    pub line_items: Vec<OrderLineItem>,
}

/// One page of an order search.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderPage {
    /// Orders on this page.
    pub orders: Vec<OrderSummary>,
    /// Whether another page follows.
    pub has_next_page: bool,
    /// Cursor to request the next page.
    pub end_cursor: Option<String>,
}

/// Search predicate for open, paid orders containing a product.
///
/// ```
/// use processing_time_core::{ProductRef, UnfulfilledOrderFilter};
///
/// let filter = UnfulfilledOrderFilter::for_product(&ProductRef::from_legacy_id(12));
/// assert_eq!(
///     filter.to_string(),
///     "product_id:12 AND financial_status:paid AND fulfillment_status:unfulfilled"
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnfulfilledOrderFilter {
    product_id: u64,
}

impl UnfulfilledOrderFilter {
    /// Filter for orders referencing `product`.
    #[must_use]
    pub const fn for_product(product: &ProductRef) -> Self {
        Self {
            product_id: product.numeric_id(),
        }
    }

    /// Numeric id of the product searched for.
    #[must_use]
    pub const fn product_id(&self) -> u64 {
        self.product_id
    }
}

impl fmt::Display for UnfulfilledOrderFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "product_id:{} AND financial_status:paid AND fulfillment_status:unfulfilled",
            self.product_id
        )
    }
}
