//! HTTP client for the catalog server.
//!
//! A thin request/response façade: no retries, no caching, no deduplication.
//! Those concerns belong to the query layer.

mod client;
mod error;

pub use client::ApiClient;
pub use error::ApiError;
