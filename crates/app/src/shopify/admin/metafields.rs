//! Product metafield reads and writes for the Admin API.

use processing_time_core::{Metafield, MetafieldKey, MetafieldType, ProductRef};
use tracing::instrument;

use super::{
    AdminClient, AdminShopifyError,
    queries::{GetProductMetafield, MetafieldsSet, get_product_metafield, metafields_set},
};
use crate::services::MetafieldStore;

impl AdminClient {
    /// Get a metafield on a product.
    ///
    /// Returns `None` if either the product or the metafield does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns an error response.
    #[instrument(skip_all, fields(shop = %self.shop(), product_id = %product, metafield = %key))]
    pub async fn product_metafield(
        &self,
        product: &ProductRef,
        key: MetafieldKey,
    ) -> Result<Option<Metafield>, AdminShopifyError> {
        let variables = get_product_metafield::Variables {
            id: product.as_gid().to_string(),
            namespace: key.namespace.to_string(),
            key: key.key.to_string(),
        };

        let response = self.execute::<GetProductMetafield>(variables).await?;

        Ok(response
            .product
            .and_then(|p| p.metafield)
            .map(|m| Metafield {
                id: m.id,
                value: m.value,
            }))
    }

    /// Create or overwrite a metafield on a product.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::UserError` if Shopify rejects the value,
    /// or another error if the request fails.
    #[instrument(skip_all, fields(shop = %self.shop(), product_id = %product, metafield = %key))]
    pub async fn set_product_metafield(
        &self,
        product: &ProductRef,
        key: MetafieldKey,
        value: &str,
        value_type: MetafieldType,
    ) -> Result<Metafield, AdminShopifyError> {
        let variables = metafields_set::Variables {
            metafields: vec![metafields_set::MetafieldsSetInput {
                owner_id: product.as_gid().to_string(),
                namespace: Some(key.namespace.to_string()),
                key: key.key.to_string(),
                value: value.to_string(),
                type_: Some(value_type.as_str().to_string()),
            }],
        };

        let response = self.execute::<MetafieldsSet>(variables).await?;
        convert_metafields_set(response)
    }
}

fn convert_metafields_set(
    response: metafields_set::ResponseData,
) -> Result<Metafield, AdminShopifyError> {
    let payload = response
        .metafields_set
        .ok_or_else(|| AdminShopifyError::NotFound("metafieldsSet payload".to_string()))?;

    if !payload.user_errors.is_empty() {
        let messages: Vec<String> = payload
            .user_errors
            .into_iter()
            .map(|e| match e.field {
                Some(field) if !field.is_empty() => format!("{}: {}", field.join("."), e.message),
                _ => e.message,
            })
            .collect();
        return Err(AdminShopifyError::UserError(messages.join("; ")));
    }

    payload
        .metafields
        .and_then(|metafields| metafields.into_iter().next())
        .map(|m| Metafield {
            id: m.id,
            value: m.value,
        })
        .ok_or_else(|| AdminShopifyError::NotFound("metafield in metafieldsSet".to_string()))
}

impl MetafieldStore for AdminClient {
    async fn get_metafield(
        &self,
        owner: &ProductRef,
        key: MetafieldKey,
    ) -> Result<Option<Metafield>, AdminShopifyError> {
        self.product_metafield(owner, key).await
    }

    async fn set_metafield(
        &self,
        owner: &ProductRef,
        key: MetafieldKey,
        value: &str,
        value_type: MetafieldType,
    ) -> Result<Metafield, AdminShopifyError> {
        self.set_product_metafield(owner, key, value, value_type)
            .await
    }
}
