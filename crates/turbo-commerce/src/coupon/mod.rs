//! Coupon application.

mod coupon;
mod evaluator;

pub use coupon::{clamp_discount, normalize_code, Coupon, CouponKind};
pub use evaluator::{ActiveDiscount, CouponError, CouponEvaluator, CouponState, RevalidationPolicy};
