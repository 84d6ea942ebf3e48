//! Processing time recomputation.
//!
//! The processing time of a product is its assembly time multiplied by the
//! quantity still to be fulfilled across every open, paid order. It is
//! always recomputed from scratch, so running it twice for the same product
//! writes the same value.

use std::future::Future;
use std::str::FromStr;

use processing_time_core::{
    AssemblyTime, Metafield, MetafieldKey, MetafieldType, OrderPage, OrderSummary,
    ProcessingTime, ProductRef, UnfulfilledOrderFilter, unfulfilled_quantity,
};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::shopify::AdminShopifyError;

/// Read and write access to product metafields.
pub trait MetafieldStore: Send + Sync {
    /// Fetch a metafield, or `None` if it has never been set.
    fn get_metafield(
        &self,
        owner: &ProductRef,
        key: MetafieldKey,
    ) -> impl Future<Output = Result<Option<Metafield>, AdminShopifyError>> + Send;

    /// Create or overwrite a metafield.
    fn set_metafield(
        &self,
        owner: &ProductRef,
        key: MetafieldKey,
        value: &str,
        value_type: MetafieldType,
    ) -> impl Future<Output = Result<Metafield, AdminShopifyError>> + Send;
}

/// Paginated order search.
pub trait OrderSearch: Send + Sync {
    /// Fetch the page of orders matching `filter` that follows `after`.
    fn search_orders(
        &self,
        filter: &UnfulfilledOrderFilter,
        after: Option<&str>,
    ) -> impl Future<Output = Result<OrderPage, AdminShopifyError>> + Send;
}

/// What to do when a product has no assembly time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingAssemblyTime {
    /// Abort with [`RecomputeError::MetafieldNotFound`] and write nothing.
    #[default]
    Fail,
    /// Recompute as if the assembly time were zero.
    TreatAsZero,
}

impl FromStr for MissingAssemblyTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "zero" => Ok(Self::TreatAsZero),
            other => Err(format!("expected 'fail' or 'zero', got '{other}'")),
        }
    }
}

/// Reasons a recomputation did not write a processing time.
#[derive(Debug, Error)]
pub enum RecomputeError {
    #[error("Metafield {key} not found on {product}")]
    MetafieldNotFound {
        product: ProductRef,
        key: MetafieldKey,
    },

    #[error("Invalid assembly time on {product}: {value:?}")]
    InvalidAssemblyTime { product: ProductRef, value: String },

    #[error("Shopify request failed: {0}")]
    Transport(AdminShopifyError),

    #[error("Shopify rejected the metafield: {0}")]
    Validation(String),

    #[error("Unexpected failure: {0}")]
    Unexpected(String),
}

impl RecomputeError {
    /// Whether this failure is one the caller cannot classify.
    ///
    /// The webhook route answers these with a 5xx so Shopify redelivers.
    #[must_use]
    pub const fn is_unexpected(&self) -> bool {
        matches!(self, Self::Unexpected(_))
    }
}

impl From<AdminShopifyError> for RecomputeError {
    fn from(err: AdminShopifyError) -> Self {
        match err {
            AdminShopifyError::UserError(message) => Self::Validation(message),
            AdminShopifyError::Parse(e) => Self::Unexpected(e.to_string()),
            AdminShopifyError::NotFound(what) => Self::Unexpected(format!("missing {what}")),
            other => Self::Transport(other),
        }
    }
}

/// Recomputes the processing time metafield of a product.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessingTimeService {
    missing_assembly_time: MissingAssemblyTime,
}

impl ProcessingTimeService {
    /// Create a service with the given missing assembly time policy.
    #[must_use]
    pub const fn new(missing_assembly_time: MissingAssemblyTime) -> Self {
        Self {
            missing_assembly_time,
        }
    }

    /// Recompute and store the processing time of `product`.
    ///
    /// Reads the assembly time, sums the fulfillable quantity of the product
    /// over every unfulfilled paid order, and writes the product of the two.
    /// Exactly one metafield write happens on success and none on failure.
    ///
    /// # Errors
    ///
    /// Returns [`RecomputeError::MetafieldNotFound`] when the assembly time
    /// is absent under [`MissingAssemblyTime::Fail`],
    /// [`RecomputeError::InvalidAssemblyTime`] when it is not a non-negative
    /// integer, and a transport, validation or unexpected error when Shopify
    /// calls fail.
    #[instrument(skip_all, fields(product_id = %product))]
    pub async fn recompute<C>(
        &self,
        client: &C,
        product: &ProductRef,
    ) -> Result<ProcessingTime, RecomputeError>
    where
        C: MetafieldStore + OrderSearch,
    {
        let assembly_time = self.assembly_time(client, product).await?;
        let orders = all_unfulfilled_orders(client, product).await?;
        let quantity = unfulfilled_quantity(product, &orders);
        let processing_time = ProcessingTime::compute(assembly_time, quantity);

        debug!(
            orders = orders.len(),
            quantity,
            assembly_time = assembly_time.get(),
            "Aggregated unfulfilled quantity"
        );

        client
            .set_metafield(
                product,
                MetafieldKey::PROCESSING_TIME,
                &processing_time.get().to_string(),
                MetafieldType::NumberInteger,
            )
            .await?;

        info!(
            processing_time = processing_time.get(),
            "Updated processing time"
        );
        Ok(processing_time)
    }

    async fn assembly_time<C: MetafieldStore>(
        &self,
        client: &C,
        product: &ProductRef,
    ) -> Result<AssemblyTime, RecomputeError> {
        let metafield = client
            .get_metafield(product, MetafieldKey::ASSEMBLY_TIME)
            .await?;

        match metafield {
            Some(metafield) => AssemblyTime::parse(&metafield.value).map_err(|_| {
                RecomputeError::InvalidAssemblyTime {
                    product: product.clone(),
                    value: metafield.value,
                }
            }),
            None => match self.missing_assembly_time {
                MissingAssemblyTime::Fail => Err(RecomputeError::MetafieldNotFound {
                    product: product.clone(),
                    key: MetafieldKey::ASSEMBLY_TIME,
                }),
                MissingAssemblyTime::TreatAsZero => {
                    debug!("No assembly time set, treating as zero");
                    Ok(AssemblyTime::new(0))
                }
            },
        }
    }
}

/// Follow the order search cursor until every page has been read.
async fn all_unfulfilled_orders<C: OrderSearch>(
    client: &C,
    product: &ProductRef,
) -> Result<Vec<OrderSummary>, RecomputeError> {
    let filter = UnfulfilledOrderFilter::for_product(product);
    let mut orders = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = client.search_orders(&filter, cursor.as_deref()).await?;
        orders.extend(page.orders);

        if !page.has_next_page {
            return Ok(orders);
        }
        match page.end_cursor {
            Some(next) if cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
            Some(_) => {
                return Err(RecomputeError::Unexpected(
                    "order search returned the same cursor twice".to_string(),
                ));
            }
            None => {
                return Err(RecomputeError::Unexpected(
                    "order search has more pages but no cursor".to_string(),
                ));
            }
        }
    }
}
