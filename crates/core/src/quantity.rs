//! Unfulfilled quantity aggregation.

use crate::types::{OrderSummary, ProductRef};

/// Sum the fulfillable quantity of every line item referencing `product`.
///
/// The orders are expected to be the complete result of an
/// [`UnfulfilledOrderFilter`](crate::UnfulfilledOrderFilter) search; no
/// status filtering happens here. Line items without a product are skipped.
///
/// ```
/// use processing_time_core::{OrderLineItem, OrderSummary, ProductRef, unfulfilled_quantity};
///
/// let product = ProductRef::from_legacy_id(1);
/// let orders = vec![OrderSummary {
///     id: "gid://shopify/Order/1".into(),
///     line_items: vec![OrderLineItem {
///         product: Some(product.clone()),
///         quantity: 3,
///         fulfillable_quantity: 2,
///     }],
/// }];
/// assert_eq!(unfulfilled_quantity(&product, &orders), 2);
/// ```
#[must_use]
pub fn unfulfilled_quantity<'a, I>(product: &ProductRef, orders: I) -> u64
where
    I: IntoIterator<Item = &'a OrderSummary>,
{
    orders
        .into_iter()
        .flat_map(|order| &order.line_items)
        .filter(|item| item.product.as_ref() == Some(product))
        .map(|item| item.fulfillable_quantity)
        .sum()
}
