//! Processing Time Core - Shared types and pure logic.
//!
//! This crate provides the types used by the processing time app:
//! - `app` - Webhook service and Shopify Admin API client
//! - `cli` - Command-line tools for migrations and operator tasks
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. This keeps the recomputation arithmetic testable
//! without Shopify.
//!
//! # Modules
//!
//! - [`types`] - Shop and product identifiers, metafields, order summaries
//! - [`quantity`] - Unfulfilled quantity aggregation
//! - [`webhook`] - Webhook topics and payload parsing

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod quantity;
pub mod types;
pub mod webhook;

pub use quantity::unfulfilled_quantity;
pub use types::*;
pub use webhook::{OrderPayload, ProductDemand, UnknownTopic, WebhookTopic};
