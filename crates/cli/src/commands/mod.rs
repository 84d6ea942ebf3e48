//! CLI command implementations.

pub mod metafields;
pub mod migrate;
pub mod shop;
pub mod webhooks;
