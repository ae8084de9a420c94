//! # TurboCommerce Storefront
//!
//! One object a client application holds for the whole shopping flow:
//! cart, coupon, checkout and the logged-in session.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use turbo_storefront::{Storefront, StorefrontOptions};
//!
//! let api = Arc::new(ApiClient::new(ApiConfig::new(url))?);
//! let store = Storefront::new(session, api.clone(), api, StorefrontOptions::default())?;
//!
//! store.add_product(&product, None, 2)?;
//! store.apply_coupon("SAVE10").await?;
//! println!("pay {}", store.totals().payable);
//! store.checkout(&form).await?;
//! ```

mod error;
pub mod orders;
mod storefront;

pub use error::StorefrontError;
pub use orders::OrderStatusView;
pub use storefront::{Storefront, StorefrontOptions, Totals};
