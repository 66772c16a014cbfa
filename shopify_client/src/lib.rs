//! Outbound client for the merchant platform's admin API.
//!
//! The dispatcher pushes order updates upstream through [`ShopifyApi`],
//! pacing itself with the [`rate_limit::TokenBucket`] so the documented
//! upstream rate is respected client-side, and surfacing `429 Retry-After`
//! to the caller instead of retrying internally.

mod api;
mod config;
mod error;
pub mod rate_limit;

pub use api::{OrderPushOutcome, ShopifyApi};
pub use config::ShopifyClientConfig;
pub use error::ShopifyApiError;
