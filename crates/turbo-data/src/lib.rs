//! HTTP client for the TurboCommerce storefront API.
//!
//! [`ApiClient`] speaks the REST endpoints for coupons, orders, products and
//! login, and plugs into the commerce core as both a
//! [`CouponValidator`](turbo_commerce::gateway::CouponValidator) and an
//! [`OrderGateway`](turbo_commerce::gateway::OrderGateway).
//!
//! # Example
//!
//! ```rust,ignore
//! use turbo_data::{ApiClient, ApiConfig};
//!
//! let client = ApiClient::new(ApiConfig::new("https://api.example.com"))?;
//! let products = client.search_products("tee", 10).await?;
//! ```

mod client;
mod error;
mod retry;
mod wire;

pub use client::{ApiClient, ApiConfig, ApiPaths};
pub use error::ApiError;
pub use retry::{BackoffStrategy, RetryPolicy};
pub use wire::LoginGrant;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{ApiClient, ApiConfig, ApiError, LoginGrant, RetryPolicy};
}
