//! Order search for the Admin API.
//!
//! Orders are requested [`ORDER_PAGE_SIZE`] at a time with up to
//! [`LINE_ITEM_PAGE_SIZE`] line items each. Orders with more line items are
//! completed with follow-up `GetOrderLineItems` requests so callers always
//! receive whole orders.

use processing_time_core::{
    OrderLineItem, OrderPage, OrderSummary, ProductRef, UnfulfilledOrderFilter,
};
use tracing::{instrument, warn};

use super::{
    AdminClient, AdminShopifyError,
    queries::{
        GetOrderLineItems, GetUnfulfilledOrders, get_order_line_items, get_unfulfilled_orders,
    },
};
use crate::services::OrderSearch;

/// Maximum orders per page allowed by the Admin API.
pub const ORDER_PAGE_SIZE: i64 = 100;

/// Maximum line items per order page allowed by the Admin API.
pub const LINE_ITEM_PAGE_SIZE: i64 = 100;

/// One page of an order's line items.
#[derive(Debug, Clone, Default)]
struct LineItemPage {
    line_items: Vec<OrderLineItem>,
    has_next_page: bool,
    end_cursor: Option<String>,
}

impl AdminClient {
    /// Fetch one page of orders matching `filter`.
    ///
    /// # Arguments
    ///
    /// * `filter` - Search predicate
    /// * `after` - Cursor from the previous page's `end_cursor`
    ///
    /// # Errors
    ///
    /// Returns an error if any request fails or returns an error response.
    #[instrument(skip_all, fields(shop = %self.shop(), filter = %filter, after = ?after))]
    pub async fn unfulfilled_orders_page(
        &self,
        filter: &UnfulfilledOrderFilter,
        after: Option<&str>,
    ) -> Result<OrderPage, AdminShopifyError> {
        let variables = get_unfulfilled_orders::Variables {
            query: filter.to_string(),
            first: ORDER_PAGE_SIZE,
            after: after.map(String::from),
            line_items_first: LINE_ITEM_PAGE_SIZE,
        };

        let response = self.execute::<GetUnfulfilledOrders>(variables).await?;
        let connection = response.orders;

        let mut orders = Vec::with_capacity(connection.nodes.len());
        for order in connection.nodes {
            let first = first_line_item_page(order.line_items);
            let id = &order.id;
            let line_items =
                collect_line_items(id, first, move |after| self.line_items_page(id, after))
                    .await?;
            orders.push(OrderSummary {
                id: order.id,
                line_items,
            });
        }

        Ok(OrderPage {
            orders,
            has_next_page: connection.page_info.has_next_page,
            end_cursor: connection.page_info.end_cursor,
        })
    }

    /// Fetch the line items of an order that follow `after`.
    #[instrument(skip(self))]
    async fn line_items_page(
        &self,
        order_id: &str,
        after: String,
    ) -> Result<LineItemPage, AdminShopifyError> {
        let variables = get_order_line_items::Variables {
            id: order_id.to_string(),
            first: LINE_ITEM_PAGE_SIZE,
            after: Some(after),
        };

        let response = self.execute::<GetOrderLineItems>(variables).await?;
        let order = response
            .order
            .ok_or_else(|| AdminShopifyError::NotFound(order_id.to_string()))?;

        let connection = order.line_items;
        Ok(LineItemPage {
            line_items: connection
                .nodes
                .iter()
                .map(|item| {
                    convert_line_item(
                        item.product.as_ref().map(|p| p.id.as_str()),
                        item.quantity,
                        item.fulfillable_quantity,
                    )
                })
                .collect(),
            has_next_page: connection.page_info.has_next_page,
            end_cursor: connection.page_info.end_cursor,
        })
    }
}

/// Complete an order's line items, starting from the page embedded in the
/// order search and calling `fetch` with each following cursor.
async fn collect_line_items<F, Fut>(
    order_id: &str,
    first: LineItemPage,
    mut fetch: F,
) -> Result<Vec<OrderLineItem>, AdminShopifyError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<LineItemPage, AdminShopifyError>>,
{
    let LineItemPage {
        mut line_items,
        mut has_next_page,
        mut end_cursor,
    } = first;

    while has_next_page {
        let Some(after) = end_cursor.take() else {
            return Err(AdminShopifyError::NotFound(format!(
                "line item cursor for {order_id}"
            )));
        };

        let page = fetch(after.clone()).await?;
        if page.has_next_page && page.end_cursor.as_deref() == Some(after.as_str()) {
            return Err(AdminShopifyError::NotFound(format!(
                "next line item cursor for {order_id}"
            )));
        }

        line_items.extend(page.line_items);
        has_next_page = page.has_next_page;
        end_cursor = page.end_cursor;
    }

    Ok(line_items)
}

fn first_line_item_page(
    connection: get_unfulfilled_orders::GetUnfulfilledOrdersOrdersNodesLineItems,
) -> LineItemPage {
    LineItemPage {
        line_items: connection
            .nodes
            .iter()
            .map(|item| {
                convert_line_item(
                    item.product.as_ref().map(|p| p.id.as_str()),
                    item.quantity,
                    item.fulfillable_quantity,
                )
            })
            .collect(),
        has_next_page: connection.page_info.has_next_page,
        end_cursor: connection.page_info.end_cursor,
    }
}

fn convert_line_item(product_id: Option<&str>, quantity: i64, fulfillable: i64) -> OrderLineItem {
    let product = product_id.and_then(|id| match ProductRef::parse(id) {
        Ok(product) => Some(product),
        Err(e) => {
            warn!(product_id = %id, error = %e, "Ignoring line item with unparseable product id");
            None
        }
    });

    OrderLineItem {
        product,
        quantity: u64::try_from(quantity).unwrap_or(0),
        fulfillable_quantity: u64::try_from(fulfillable).unwrap_or(0),
    }
}

impl OrderSearch for AdminClient {
    async fn search_orders(
        &self,
        filter: &UnfulfilledOrderFilter,
        after: Option<&str>,
    ) -> Result<OrderPage, AdminShopifyError> {
        self.unfulfilled_orders_page(filter, after).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::{collections::VecDeque, future::ready};

    use super::*;

    const ORDER: &str = "gid://shopify/Order/1";

    fn item(product: u64, fulfillable: u64) -> OrderLineItem {
        OrderLineItem {
            product: Some(ProductRef::from_legacy_id(product)),
            quantity: fulfillable,
            fulfillable_quantity: fulfillable,
        }
    }

    fn page(
        items: Vec<OrderLineItem>,
        end_cursor: Option<&str>,
        has_next_page: bool,
    ) -> LineItemPage {
        LineItemPage {
            line_items: items,
            has_next_page,
            end_cursor: end_cursor.map(String::from),
        }
    }

    #[test]
    fn test_first_line_item_page() {
        let connection: get_unfulfilled_orders::GetUnfulfilledOrdersOrdersNodesLineItems =
            serde_json::from_str(
                r#"{
                    "pageInfo": {"hasNextPage": true, "endCursor": "li-1"},
                    "nodes": [
                        {"product": {"id": "gid://shopify/Product/5"}, "quantity": 4, "fulfillableQuantity": 3},
                        {"product": null, "quantity": 1, "fulfillableQuantity": 1},
                        {"product": {"id": "gid://shopify/ProductVariant/5"}, "quantity": 1, "fulfillableQuantity": 1},
                        {"product": {"id": "gid://shopify/Product/6"}, "quantity": 2, "fulfillableQuantity": -1}
                    ]
                }"#,
            )
            .unwrap();

        let page = first_line_item_page(connection);
        assert!(page.has_next_page);
        assert_eq!(page.end_cursor.as_deref(), Some("li-1"));

        let items = page.line_items;
        assert_eq!(items.len(), 4);
        assert_eq!(
            items.first().unwrap().product,
            Some(ProductRef::from_legacy_id(5))
        );
        assert_eq!(items.first().unwrap().fulfillable_quantity, 3);
        assert!(items.get(1).unwrap().product.is_none());
        assert!(items.get(2).unwrap().product.is_none());
        assert_eq!(items.get(3).unwrap().fulfillable_quantity, 0);
    }

    #[tokio::test]
    async fn test_single_page_does_not_fetch() {
        let mut requested = Vec::new();
        let items = collect_line_items(ORDER, page(vec![item(1, 2)], None, false), |after| {
            requested.push(after);
            ready(Ok(LineItemPage::default()))
        })
        .await
        .unwrap();

        assert_eq!(items, vec![item(1, 2)]);
        assert!(requested.is_empty());
    }

    #[tokio::test]
    async fn test_follows_line_item_cursors() {
        let mut pages = VecDeque::from(vec![
            page(vec![item(2, 1)], Some("li-2"), true),
            page(vec![item(3, 4)], None, false),
        ]);
        let mut requested = Vec::new();

        let items = collect_line_items(ORDER, page(vec![item(1, 2)], Some("li-1"), true), |after| {
            requested.push(after);
            ready(
                pages
                    .pop_front()
                    .ok_or_else(|| AdminShopifyError::NotFound("page".to_string())),
            )
        })
        .await
        .unwrap();

        assert_eq!(items, vec![item(1, 2), item(2, 1), item(3, 4)]);
        assert_eq!(requested, vec!["li-1".to_string(), "li-2".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_line_item_cursor_is_not_found() {
        let mut requested = Vec::new();
        let err = collect_line_items(ORDER, page(vec![item(1, 2)], None, true), |after| {
            requested.push(after);
            ready(Ok(LineItemPage::default()))
        })
        .await
        .unwrap_err();

        match err {
            AdminShopifyError::NotFound(what) => assert!(what.contains(ORDER)),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(requested.is_empty());
    }

    #[tokio::test]
    async fn test_repeated_line_item_cursor_is_not_found() {
        let err = collect_line_items(ORDER, page(vec![], Some("li-1"), true), |_| {
            ready(Ok(page(vec![item(1, 1)], Some("li-1"), true)))
        })
        .await
        .unwrap_err();

        assert!(matches!(err, AdminShopifyError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_order_gone_while_paging_propagates() {
        let err = collect_line_items(ORDER, page(vec![item(1, 2)], Some("li-1"), true), |_| {
            ready(Err(AdminShopifyError::NotFound(ORDER.to_string())))
        })
        .await
        .unwrap_err();

        match err {
            AdminShopifyError::NotFound(what) => assert_eq!(what, ORDER),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
