//! Processing Time app library.
//!
//! Keeps a per-product processing time metafield in sync with open orders:
//! order webhooks trigger a recomputation of assembly time × unfulfilled
//! quantity for every product they mention, written back through the
//! Shopify Admin API.
//!
//! # Security
//!
//! Holds each installed shop's offline Admin API token. Every inbound
//! webhook and OAuth redirect is HMAC-verified with the app secret before
//! it is acted on.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod shopify;
pub mod state;
