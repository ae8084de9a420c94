//! Storefront domain core for TurboCommerce.
//!
//! - **Pricing**: normalization of catalog price shapes
//! - **Cart**: line items, subtotal, change notification
//! - **Coupon**: validated discounts that track the cart revision
//! - **Checkout**: shipping form, order submission, double-submit guard
//!
//! # Example
//!
//! ```rust,ignore
//! use turbo_commerce::prelude::*;
//!
//! let cart = CartStore::new(Currency::USD);
//! cart.add_item(ProductId::new("tee"), "Tee", Money::new(2000, Currency::USD), 2, Variant::default())?;
//!
//! let coupons = CouponEvaluator::new(validator, RevalidationPolicy::Revalidate);
//! coupons.apply_coupon("SAVE10", &cart.snapshot()).await?;
//!
//! let checkout = CheckoutReconciler::new(gateway);
//! match checkout.submit(&cart, &coupons, Some(token), &form).await? {
//!     SubmitOutcome::Placed { receipt, .. } => println!("Order {}", receipt.order_id),
//!     SubmitOutcome::AlreadySubmitting => {}
//! }
//! ```

pub mod error;
pub mod events;
pub mod ids;
pub mod money;
pub mod pricing;

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod coupon;
pub mod gateway;

pub use error::CommerceError;
pub use ids::*;
pub use money::{Currency, Money};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::CommerceError;
    pub use crate::events::{EventBus, SubscriptionId};
    pub use crate::ids::*;
    pub use crate::money::{Currency, Money};
    pub use crate::pricing::{current_price, format_currency, PriceField};

    // Catalog
    pub use crate::catalog::Product;

    // Cart
    pub use crate::cart::{
        AddOutcome, Cart, CartChange, CartEvent, CartSnapshot, CartStore, LineItem, Variant,
        MAX_QUANTITY_PER_ITEM,
    };

    // Coupon
    pub use crate::coupon::{
        ActiveDiscount, Coupon, CouponError, CouponEvaluator, CouponKind, CouponState,
        RevalidationPolicy,
    };

    // Checkout
    pub use crate::checkout::{
        CheckoutError, CheckoutReconciler, CheckoutState, FieldError, OrderLine, OrderReceipt,
        OrderRecord, OrderStatus, OrderSubmission, ShippingForm, SubmitOutcome,
    };

    // Collaborators
    pub use crate::gateway::{
        CouponProduct, CouponValidationRequest, CouponValidationResponse, CouponValidator,
        GatewayError, OrderGateway,
    };
}
