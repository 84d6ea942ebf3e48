//! Assembly and processing time commands.
//!
//! # Usage
//!
//! ```bash
//! pt-cli assembly-time get -s demo.myshopify.com -p 632910392
//! pt-cli assembly-time set -s demo.myshopify.com -p 632910392 -v 4
//! pt-cli recompute -s demo.myshopify.com -p 632910392
//! ```

use processing_time_app::services::{MetafieldStore, ProcessingTimeService};
use processing_time_core::{AssemblyTime, Metafield, MetafieldKey, MetafieldType};

use super::shop::{CommandError, connect, parse_product};

/// Print the assembly and processing time of a product.
///
/// # Errors
///
/// Returns `CommandError` if the shop cannot be reached.
pub async fn show(shop: &str, product: &str) -> Result<(), CommandError> {
    let product = parse_product(product)?;
    let ctx = connect(shop).await?;

    let assembly_time = ctx
        .client
        .get_metafield(&product, MetafieldKey::ASSEMBLY_TIME)
        .await?;
    let processing_time = ctx
        .client
        .get_metafield(&product, MetafieldKey::PROCESSING_TIME)
        .await?;

    let show = |m: Option<Metafield>| m.map_or_else(|| "unset".to_string(), |m| m.value);
    #[allow(clippy::print_stdout)]
    {
        println!("product:         {product}");
        println!("assembly time:   {}", show(assembly_time));
        println!("processing time: {}", show(processing_time));
    }
    Ok(())
}

/// Write the assembly time metafield of a product.
///
/// The processing time is not recomputed; the next order event or
/// `pt-cli recompute` picks up the new value.
///
/// # Errors
///
/// Returns `CommandError::InvalidArgument` if `value` is not a non-negative
/// integer, or another error if Shopify rejects the write.
pub async fn set_assembly_time(shop: &str, product: &str, value: &str) -> Result<(), CommandError> {
    let product = parse_product(product)?;
    let assembly_time = AssemblyTime::parse(value)
        .map_err(|e| CommandError::InvalidArgument("assembly time", e.to_string()))?;
    let ctx = connect(shop).await?;

    ctx.client
        .set_metafield(
            &product,
            MetafieldKey::ASSEMBLY_TIME,
            &assembly_time.get().to_string(),
            MetafieldType::NumberInteger,
        )
        .await?;

    tracing::info!(
        product_id = %product,
        assembly_time = assembly_time.get(),
        "Assembly time saved"
    );
    Ok(())
}

/// Recompute and store the processing time of a product.
///
/// # Errors
///
/// Returns `CommandError::Recompute` if the recomputation fails.
pub async fn recompute(shop: &str, product: &str) -> Result<(), CommandError> {
    let product = parse_product(product)?;
    let ctx = connect(shop).await?;

    let service = ProcessingTimeService::new(ctx.config.missing_assembly_time);
    let processing_time = service.recompute(&ctx.client, &product).await?;

    #[allow(clippy::print_stdout)]
    {
        println!("{product}: processing time {}", processing_time.get());
    }
    Ok(())
}
