//! Business logic services.
//!
//! # Services
//!
//! - `processing_time` - Processing time recomputation for a product
//! - `webhooks` - Webhook dispatch to recomputation and compliance handlers

pub mod processing_time;
pub mod webhooks;

pub use processing_time::{
    MetafieldStore, MissingAssemblyTime, OrderSearch, ProcessingTimeService, RecomputeError,
};
pub use webhooks::{
    ConnectAdmin, CustomerDataReport, DEFAULT_RECOMPUTE_CONCURRENCY, DispatchError,
    DispatchOutcome, Dispatcher, RecomputeSummary, WebhookEvent,
};
