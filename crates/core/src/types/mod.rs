//! Core types for the processing time app.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod metafield;
pub mod order;

pub use id::{IdError, ProductRef, ShopDomain};
pub use metafield::{
    AssemblyTime, InvalidMetafieldValue, Metafield, MetafieldKey, MetafieldType, ProcessingTime,
};
pub use order::{OrderLineItem, OrderPage, OrderSummary, UnfulfilledOrderFilter};
