//! Shopping cart module.
//!
//! [`Cart`] holds the line items; [`CartStore`] shares one cart across the
//! storefront and announces every change.

mod cart;
mod store;

pub use cart::{AddOutcome, Cart, LineItem, Variant, MAX_QUANTITY_PER_ITEM};
pub use store::{CartChange, CartEvent, CartSnapshot, CartStore};
