//! Session handling for TurboCommerce storefront clients.
//!
//! The token itself is issued and verified by the backend; this crate only
//! keeps it, together with per-user cart and order snapshots, in a
//! [`turbo_cache::Cache`].

mod error;
mod session;
mod token;

pub use error::AuthError;
pub use session::{Session, SessionData, SessionEvent, MAX_RECENT_ORDERS};
pub use token::BearerToken;
